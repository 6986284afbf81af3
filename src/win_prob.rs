use serde::{Deserialize, Serialize};
use statrs::function::logistic::{logistic, logit};

/// Ratings are clamped into this range before the log-odds transform.
pub const MIN_RATING: f64 = 0.0001;
pub const MAX_RATING: f64 = 0.9999;

/// Fitted logistic model coefficients.
///
/// The intercept is the favourite's bonus: it is applied with the sign of the
/// log-odds difference, so swapping the teams negates the linear predictor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub intercept: f64,
    pub slope: f64,
}

impl Coefficients {
    /// Model implied by the rating's own definition.
    pub const THEORETICAL: Coefficients = Coefficients {
        intercept: 0.0,
        slope: 1.0,
    };

    pub fn new(intercept: f64, slope: f64) -> Self {
        Coefficients { intercept, slope }
    }

    pub fn is_theoretical(&self) -> bool {
        *self == Coefficients::THEORETICAL
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Coefficients::THEORETICAL
    }
}

/// Convert a (0,1) rating to log-odds.
///
/// Boundary and out-of-range ratings are clamped, so the result is finite for
/// any finite input. NaN passes through as NaN.
pub fn to_log_odds(rating: f64) -> f64 {
    if rating.is_nan() {
        return f64::NAN;
    }
    logit(rating.clamp(MIN_RATING, MAX_RATING))
}

/// `+1` for the favourite, `-1` for the underdog, `0` for a pick'em.
pub(crate) fn favourite_sign(diff: f64) -> f64 {
    if diff > 0.0 {
        1.0
    } else if diff < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Linear predictor for `rating_a` against `rating_b`.
pub fn linear_predictor(rating_a: f64, rating_b: f64, coefficients: &Coefficients) -> f64 {
    let diff = to_log_odds(rating_a) - to_log_odds(rating_b);
    coefficients.intercept * favourite_sign(diff) + coefficients.slope * diff
}

/// Probability that a team rated `rating_a` beats a team rated `rating_b`.
///
/// `win_probability(a, b, c) + win_probability(b, a, c) == 1` for any
/// coefficients.
pub fn win_probability(rating_a: f64, rating_b: f64, coefficients: &Coefficients) -> f64 {
    logistic(linear_predictor(rating_a, rating_b, coefficients))
}
