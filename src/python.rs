//! Python bindings, built with `--features python`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::coefficients::LoadedCoefficients;
use crate::config::EngineConfig;
use crate::error::CalcuttaError;
use crate::payout::DEFAULT_ROUND_PAYOUTS;
use crate::propagate::PropagationParams;
use crate::ratings::RatingsTable;
use crate::region::RegionRatings;
use crate::topology::DEFAULT_SEED_RATINGS;
use crate::tournament::EvEngine;
use crate::win_prob::Coefficients;

impl From<CalcuttaError> for PyErr {
    fn from(err: CalcuttaError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn engine(intercept: f64, slope: f64, decay: f64, elite: f64) -> PyResult<EvEngine> {
    let params = PropagationParams {
        regional_final_decay: decay,
        elite_opponent_rating: elite,
    };
    Ok(EvEngine::new(LoadedCoefficients::supplied(Coefficients::new(intercept, slope)))
        .with_params(params)?)
}

/// Log-odds of a rating, clamped at the boundaries.
#[pyfunction]
fn to_log_odds(rating: f64) -> f64 {
    crate::win_prob::to_log_odds(rating)
}

/// Probability that a team rated `rating_a` beats one rated `rating_b`.
#[pyfunction]
#[pyo3(signature = (rating_a, rating_b, intercept = 0.0, slope = 1.0))]
fn win_probability(rating_a: f64, rating_b: f64, intercept: f64, slope: f64) -> f64 {
    crate::win_prob::win_probability(rating_a, rating_b, &Coefficients::new(intercept, slope))
}

/// Win probabilities for the five paid rounds, second round through
/// championship. Missing seeds use the defaults.
#[pyfunction]
#[pyo3(signature = (
    seed,
    ratings,
    intercept = 0.0,
    slope = 1.0,
    regional_final_decay = PropagationParams::DEFAULT_REGIONAL_FINAL_DECAY,
    elite_opponent_rating = PropagationParams::DEFAULT_ELITE_OPPONENT_RATING
))]
fn round_probabilities(
    seed: u8,
    ratings: HashMap<u8, f64>,
    intercept: f64,
    slope: f64,
    regional_final_decay: f64,
    elite_opponent_rating: f64,
) -> PyResult<Vec<f64>> {
    let engine = engine(intercept, slope, regional_final_decay, elite_opponent_rating)?;
    let (ratings, _) = RegionRatings::from_partial(&ratings)?;
    let probs = engine.round_probabilities(seed, ratings.get(seed)?, &ratings)?;
    Ok(probs.paid().to_vec())
}

/// Score a region: `([(seed, paid_round_probs, ev), ...], total_ev)`.
#[pyfunction]
#[pyo3(signature = (ratings, intercept = 0.0, slope = 1.0))]
fn compute_region_ev(
    ratings: HashMap<u8, f64>,
    intercept: f64,
    slope: f64,
) -> PyResult<(Vec<(u8, Vec<f64>, f64)>, f64)> {
    let engine = engine(
        intercept,
        slope,
        PropagationParams::DEFAULT_REGIONAL_FINAL_DECAY,
        PropagationParams::DEFAULT_ELITE_OPPONENT_RATING,
    )?;
    let (ratings, _) = RegionRatings::from_partial(&ratings)?;
    let region = engine.compute_region_ev(&ratings)?;
    let teams = region
        .teams
        .iter()
        .map(|t| (t.seed, t.rounds.paid().to_vec(), t.ev))
        .collect();
    Ok((teams, region.total_ev))
}

/// Score a full year from a ratings CSV; returns the result as JSON.
#[pyfunction]
#[pyo3(signature = (ratings_csv, year, config_path = None))]
fn compute_bracket_ev_json(
    ratings_csv: &str,
    year: u16,
    config_path: Option<&str>,
) -> PyResult<String> {
    let config = match config_path {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => EngineConfig::default(),
    };
    let engine = EvEngine::from_config(&config)?;
    let bracket = RatingsTable::from_path(Path::new(ratings_csv))?.bracket_for_year(year)?;
    let result = engine.compute_bracket_ev(&bracket)?;
    Ok(serde_json::to_string(&result).map_err(CalcuttaError::from)?)
}

#[pymodule]
fn calcutta_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(to_log_odds, m)?)?;
    m.add_function(wrap_pyfunction!(win_probability, m)?)?;
    m.add_function(wrap_pyfunction!(round_probabilities, m)?)?;
    m.add_function(wrap_pyfunction!(compute_region_ev, m)?)?;
    m.add_function(wrap_pyfunction!(compute_bracket_ev_json, m)?)?;

    m.add("DEFAULT_SEED_RATINGS", DEFAULT_SEED_RATINGS.to_vec())?;
    m.add("ROUND_PAYOUTS", DEFAULT_ROUND_PAYOUTS.to_vec())?;

    Ok(())
}
