//! Round-by-round advancement probabilities for a single team.
//!
//! Rounds 1-3 are exact given the region's ratings. The regional final uses a
//! seed-decay weighting over the eight possible opponents, and the two
//! national rounds are played against one representative elite opponent.

use serde::{Deserialize, Serialize};

use crate::error::{CalcuttaError, Result};
use crate::region::{check_rating, RegionRatings};
use crate::topology::{BracketTopology, Round, ROUNDS};
use crate::win_prob::{win_probability, Coefficients};

/// Tunable approximations for the rounds that are not enumerated exactly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationParams {
    /// Regional-final opponent weight is `decay^(seed - 1)`.
    pub regional_final_decay: f64,
    /// Rating of the representative opponent in both national rounds.
    pub elite_opponent_rating: f64,
}

impl PropagationParams {
    pub const DEFAULT_REGIONAL_FINAL_DECAY: f64 = 0.75;
    pub const DEFAULT_ELITE_OPPONENT_RATING: f64 = 0.95;

    pub fn validate(&self) -> Result<()> {
        let decay = self.regional_final_decay;
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(CalcuttaError::InvalidParameter {
                name: "regional_final_decay",
                reason: format!("must be in (0, 1], got {decay}"),
            });
        }
        let elite = self.elite_opponent_rating;
        if !(elite > 0.0 && elite < 1.0) {
            return Err(CalcuttaError::InvalidParameter {
                name: "elite_opponent_rating",
                reason: format!("must be in (0, 1), got {elite}"),
            });
        }
        Ok(())
    }
}

impl Default for PropagationParams {
    fn default() -> Self {
        PropagationParams {
            regional_final_decay: Self::DEFAULT_REGIONAL_FINAL_DECAY,
            elite_opponent_rating: Self::DEFAULT_ELITE_OPPONENT_RATING,
        }
    }
}

/// Probability of winning each round, indexed by [`Round`].
///
/// Non-increasing by construction: each entry is the previous one times a
/// conditional win probability. Serialized with one named field per round.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "NamedRounds", from = "NamedRounds")]
pub struct RoundProbabilities([f64; ROUNDS]);

#[derive(Serialize, Deserialize)]
struct NamedRounds {
    first_round: f64,
    second_round: f64,
    regional_semifinal: f64,
    regional_final: f64,
    national_semifinal: f64,
    championship: f64,
}

impl From<RoundProbabilities> for NamedRounds {
    fn from(p: RoundProbabilities) -> Self {
        NamedRounds {
            first_round: p.0[0],
            second_round: p.0[1],
            regional_semifinal: p.0[2],
            regional_final: p.0[3],
            national_semifinal: p.0[4],
            championship: p.0[5],
        }
    }
}

impl From<NamedRounds> for RoundProbabilities {
    fn from(n: NamedRounds) -> Self {
        RoundProbabilities([
            n.first_round,
            n.second_round,
            n.regional_semifinal,
            n.regional_final,
            n.national_semifinal,
            n.championship,
        ])
    }
}

impl RoundProbabilities {
    pub fn new(probs: [f64; ROUNDS]) -> Self {
        RoundProbabilities(probs)
    }

    pub fn get(&self, round: Round) -> f64 {
        self.0[round.index()]
    }

    pub fn as_array(&self) -> &[f64; ROUNDS] {
        &self.0
    }

    /// Win probabilities for the five paid rounds (second round onward).
    pub fn paid(&self) -> [f64; ROUNDS - 1] {
        let mut out = [0.0; ROUNDS - 1];
        out.copy_from_slice(&self.0[1..]);
        out
    }

    pub fn champion(&self) -> f64 {
        self.get(Round::Championship)
    }

    pub fn is_non_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] >= w[1])
    }
}

/// Everything the propagator reads besides the region's ratings.
#[derive(Clone, Copy, Debug)]
pub struct Propagator<'a> {
    pub coefficients: &'a Coefficients,
    pub params: &'a PropagationParams,
    pub topology: &'a BracketTopology,
}

impl<'a> Propagator<'a> {
    pub fn new(
        coefficients: &'a Coefficients,
        params: &'a PropagationParams,
        topology: &'a BracketTopology,
    ) -> Self {
        Propagator {
            coefficients,
            params,
            topology,
        }
    }

    fn win(&self, rating: f64, opponent: f64) -> f64 {
        win_probability(rating, opponent, self.coefficients)
    }

    /// Probability that each team of a first-round pair advances.
    fn first_round_pair(&self, seed: u8, ratings: &RegionRatings) -> Result<f64> {
        let opp = self.topology.first_round_opponent(seed)?;
        Ok(self.win(ratings.get(seed)?, ratings.get(opp)?))
    }

    /// Probabilities of winning rounds 1 and 2.
    fn through_second_round(
        &self,
        seed: u8,
        rating: f64,
        ratings: &RegionRatings,
    ) -> Result<(f64, f64)> {
        let first_opp = self.topology.first_round_opponent(seed)?;
        let p1 = self.win(rating, ratings.get(first_opp)?);

        let pair = self.topology.opponents(Round::SecondRound, seed)?;
        let (x, y) = (pair[0], pair[1]);
        // x and y meet in round 1, so exactly one of them advances.
        let x_advances = self.first_round_pair(x, ratings)?;
        let y_advances = 1.0 - x_advances;

        let p2 = p1
            * (x_advances * self.win(rating, ratings.get(x)?)
                + y_advances * self.win(rating, ratings.get(y)?));
        Ok((p1, p2))
    }

    /// Normalise `weights` and return the weighted win probability against
    /// `opponents`.
    fn weighted_win(
        &self,
        rating: f64,
        opponents: &[u8],
        weights: &[f64],
        ratings: &RegionRatings,
    ) -> Result<f64> {
        let total: f64 = weights.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(CalcuttaError::InvalidParameter {
                name: "opponent weights",
                reason: format!("weights sum to {total}"),
            });
        }
        let mut prob = 0.0;
        for (&opp, &w) in opponents.iter().zip(weights) {
            prob += (w / total) * self.win(rating, ratings.get(opp)?);
        }
        Ok(prob)
    }

    /// Probability of winning each round for the team in `seed`.
    ///
    /// `rating` is the team's own rating; `ratings` supplies every seed in the
    /// region, including the team's own slot, for opponent lookups.
    pub fn round_probabilities(
        &self,
        seed: u8,
        rating: f64,
        ratings: &RegionRatings,
    ) -> Result<RoundProbabilities> {
        check_rating(seed, rating)?;
        ratings.check_finite()?;
        let (p1, p2) = self.through_second_round(seed, rating, ratings)?;

        let pod = self.topology.opponents(Round::RegionalSemifinal, seed)?;
        let mut pod_weights = Vec::with_capacity(pod.len());
        for &opp in pod {
            let (_, reach) = self.through_second_round(opp, ratings.get(opp)?, ratings)?;
            pod_weights.push(reach);
        }
        let p3 = p2 * self.weighted_win(rating, pod, &pod_weights, ratings)?;

        let half = self.topology.opponents(Round::RegionalFinal, seed)?;
        let decay = self.params.regional_final_decay;
        let half_weights: Vec<f64> = half
            .iter()
            .map(|&opp| decay.powi(i32::from(opp) - 1))
            .collect();
        let p4 = p3 * self.weighted_win(rating, half, &half_weights, ratings)?;

        let vs_elite = self.win(rating, self.params.elite_opponent_rating);
        let p5 = p4 * vs_elite;
        let p6 = p5 * vs_elite;

        Ok(RoundProbabilities([p1, p2, p3, p4, p5, p6]))
    }
}

/// Free-function form of [`Propagator::round_probabilities`] using the
/// standard topology.
pub fn compute_round_probabilities(
    seed: u8,
    rating: f64,
    ratings: &RegionRatings,
    coefficients: &Coefficients,
    params: &PropagationParams,
) -> Result<RoundProbabilities> {
    let topology = BracketTopology::standard();
    Propagator::new(coefficients, params, &topology).round_probabilities(seed, rating, ratings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{
        DEFAULT_SEED_RATINGS, FIRST_ROUND, FOURTH_ROUND, SECOND_ROUND, THIRD_ROUND,
    };
    use proptest::prelude::*;

    const FITTED: Coefficients = Coefficients {
        intercept: 0.32,
        slope: 0.80,
    };

    fn probs(seed: u8, ratings: &RegionRatings, coefficients: &Coefficients) -> RoundProbabilities {
        let params = PropagationParams::default();
        let rating = ratings.get(seed).unwrap();
        compute_round_probabilities(seed, rating, ratings, coefficients, &params).unwrap()
    }

    fn scenario_region() -> RegionRatings {
        RegionRatings::seed_defaults()
            .with_rating(1, 0.98)
            .and_then(|r| r.with_rating(16, 0.55))
            .and_then(|r| r.with_rating(8, 0.78))
            .and_then(|r| r.with_rating(9, 0.76))
            .unwrap()
    }

    #[test]
    fn test_known_matchup_one_seed() {
        let p = probs(1, &scenario_region(), &FITTED);
        assert!(p.get(Round::FirstRound) > 0.95, "got {:?}", p);
        assert!(p.is_non_increasing());
    }

    #[test]
    fn test_second_round_uses_pair_identity() {
        let ratings = scenario_region();
        let c = Coefficients::THEORETICAL;
        let p = probs(1, &ratings, &c);

        let p1 = win_probability(0.98, 0.55, &c);
        let eight_advances = win_probability(0.78, 0.76, &c);
        let expected = p1
            * (eight_advances * win_probability(0.98, 0.78, &c)
                + (1.0 - eight_advances) * win_probability(0.98, 0.76, &c));
        assert!((p.get(Round::SecondRound) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_equal_ratings_split_evenly() {
        let ratings = RegionRatings::uniform(0.8);
        for seed in 1..=16u8 {
            let p = probs(seed, &ratings, &FITTED);
            assert_eq!(p.get(Round::FirstRound), 0.5);
            assert!((p.get(Round::SecondRound) - 0.25).abs() < 1e-12);
            assert!((p.get(Round::RegionalSemifinal) - 0.125).abs() < 1e-12);
            assert!((p.get(Round::RegionalFinal) - 0.0625).abs() < 1e-12);
        }
    }

    #[test]
    fn test_exact_rounds_conserve_winners() {
        // Rounds 1-3 are exact, so the region produces 8, 4 and 2 winners.
        let ratings = RegionRatings::seed_defaults();
        let mut totals = [0.0; 3];
        for seed in 1..=16u8 {
            let p = probs(seed, &ratings, &FITTED);
            for (t, v) in totals.iter_mut().zip(p.as_array()) {
                *t += v;
            }
        }
        assert!((totals[0] - 8.0).abs() < 1e-9);
        assert!((totals[1] - 4.0).abs() < 1e-9);
        assert!((totals[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_stronger_seed_advances_more() {
        let ratings = RegionRatings::seed_defaults();
        let one = probs(1, &ratings, &FITTED);
        let sixteen = probs(16, &ratings, &FITTED);
        for round in Round::ALL {
            assert!(one.get(round) > sixteen.get(round));
        }
    }

    #[test]
    fn test_idempotent() {
        let ratings = scenario_region();
        let a = probs(5, &ratings, &FITTED);
        let b = probs(5, &ratings, &FITTED);
        assert_eq!(a, b);
    }

    #[test]
    fn test_paid_rounds_skip_first() {
        let p = RoundProbabilities::new([0.9, 0.7, 0.5, 0.3, 0.2, 0.1]);
        assert_eq!(p.paid(), [0.7, 0.5, 0.3, 0.2, 0.1]);
        assert_eq!(p.champion(), 0.1);
    }

    #[test]
    fn test_regional_final_and_national_rounds_by_hand() {
        let ratings = RegionRatings::seed_defaults()
            .with_rating(1, 0.98)
            .and_then(|r| r.with_rating(4, 0.93))
            .and_then(|r| r.with_rating(13, 0.80))
            .unwrap();
        let params = PropagationParams {
            regional_final_decay: 0.6,
            elite_opponent_rating: 0.9,
        };
        let topology = BracketTopology::standard();
        let rating = 0.935;
        let p = Propagator::new(&FITTED, &params, &topology)
            .round_probabilities(3, rating, &ratings)
            .unwrap();

        // Seed 3 meets the top half in the regional final; weights follow
        // the opponent's seed, not its position in the list.
        let top_half = [16u8, 1, 13, 4, 9, 5, 12, 8];
        let weights: Vec<f64> = top_half
            .iter()
            .map(|&s| 0.6f64.powi(i32::from(s) - 1))
            .collect();
        let total: f64 = weights.iter().sum();
        let vs_half: f64 = top_half
            .iter()
            .zip(&weights)
            .map(|(&s, &w)| w / total * win_probability(rating, ratings.get(s).unwrap(), &FITTED))
            .sum();
        let p4 = p.get(Round::RegionalSemifinal) * vs_half;
        let vs_elite = win_probability(rating, 0.9, &FITTED);

        assert!((p.get(Round::RegionalFinal) - p4).abs() < 1e-12);
        assert!((p.get(Round::NationalSemifinal) - p4 * vs_elite).abs() < 1e-12);
        assert!((p.get(Round::Championship) - p4 * vs_elite * vs_elite).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_rating_is_an_error() {
        let params = PropagationParams::default();
        let mut raw = DEFAULT_SEED_RATINGS;
        raw[0] = f64::NAN;
        let err =
            compute_round_probabilities(16, 0.45, &RegionRatings::new(raw), &FITTED, &params)
                .unwrap_err();
        assert!(matches!(err, CalcuttaError::InvalidRating { .. }));

        let own = compute_round_probabilities(
            16,
            f64::NAN,
            &RegionRatings::seed_defaults(),
            &FITTED,
            &params,
        );
        assert!(matches!(own, Err(CalcuttaError::InvalidRating { .. })));
    }

    #[test]
    fn test_rounds_serialize_by_name() {
        let p = RoundProbabilities::new([0.9, 0.7, 0.5, 0.3, 0.2, 0.1]);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["first_round"], 0.9);
        assert_eq!(json["second_round"], 0.7);
        assert_eq!(json["championship"], 0.1);
        let back: RoundProbabilities = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_malformed_topology_is_fatal() {
        let mut third: Vec<Vec<u8>> = THIRD_ROUND.iter().map(|o| o.to_vec()).collect();
        third[0] = vec![4, 5];
        let topology = BracketTopology::from_tables([
            FIRST_ROUND.iter().map(|&s| vec![s]).collect(),
            SECOND_ROUND.iter().map(|o| o.to_vec()).collect(),
            third,
            FOURTH_ROUND.iter().map(|o| o.to_vec()).collect(),
        ]);
        let params = PropagationParams::default();
        let propagator = Propagator::new(&FITTED, &params, &topology);
        let ratings = RegionRatings::seed_defaults();

        let err = propagator.round_probabilities(1, 0.965, &ratings).unwrap_err();
        assert!(matches!(
            err,
            CalcuttaError::Topology {
                round: Round::RegionalSemifinal,
                seed: 1,
                expected: 4,
                found: 2
            }
        ));
        // Seeds whose tables are intact are unaffected.
        assert!(propagator.round_probabilities(2, 0.945, &ratings).is_ok());
    }

    #[test]
    fn test_params_validation() {
        assert!(PropagationParams::default().validate().is_ok());
        let bad_decay = PropagationParams {
            regional_final_decay: 0.0,
            ..PropagationParams::default()
        };
        assert!(bad_decay.validate().is_err());
        let bad_elite = PropagationParams {
            elite_opponent_rating: 1.0,
            ..PropagationParams::default()
        };
        assert!(bad_elite.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_round_probabilities_non_increasing(
            ratings in proptest::array::uniform16(0.05f64..0.999),
            seed in 1u8..=16,
            intercept in 0.0f64..0.6,
            slope in 0.3f64..1.5,
        ) {
            let ratings = RegionRatings::new(ratings);
            let p = probs(seed, &ratings, &Coefficients::new(intercept, slope));
            prop_assert!(p.is_non_increasing());
            for v in p.as_array() {
                prop_assert!(*v > 0.0 && *v < 1.0);
            }
        }
    }
}
