//! Offline maximum-likelihood fit of the win-probability coefficients.
//!
//! Newton-Raphson on the two-feature logistic model used by
//! [`win_probability`](crate::win_prob::win_probability): features are the
//! favourite indicator `sign(diff)` and the log-odds difference `diff`.

use serde::{Deserialize, Serialize};
use statrs::function::logistic::logistic;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::coefficients::{CoefficientsFile, FitMetadata};
use crate::error::{CalcuttaError, Result};
use crate::win_prob::{favourite_sign, linear_predictor, to_log_odds, Coefficients};

const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-9;
const MIN_DETERMINANT: f64 = 1e-12;

/// One historical tournament game.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalGame {
    pub year: u16,
    pub rating_a: f64,
    pub rating_b: f64,
    pub a_won: bool,
}

#[derive(Debug, Deserialize)]
struct GameRow {
    year: u16,
    rating_a: f64,
    rating_b: f64,
    a_won: u8,
}

/// Read games from CSV with columns `year,rating_a,rating_b,a_won` (1 or 0).
pub fn read_games<R: Read>(reader: R) -> Result<Vec<HistoricalGame>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut games = Vec::new();
    for row in csv.deserialize::<GameRow>() {
        let row = row?;
        let a_won = match row.a_won {
            0 => false,
            1 => true,
            other => {
                return Err(CalcuttaError::Fit(format!(
                    "a_won must be 0 or 1, got {other} ({} game)",
                    row.year
                )))
            }
        };
        games.push(HistoricalGame {
            year: row.year,
            rating_a: row.rating_a,
            rating_b: row.rating_b,
            a_won,
        });
    }
    Ok(games)
}

pub fn read_games_from_path(path: &Path) -> Result<Vec<HistoricalGame>> {
    let file = File::open(path).map_err(|e| CalcuttaError::io(path, e))?;
    read_games(file)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FitSummary {
    pub coefficients: Coefficients,
    pub games: usize,
    pub iterations: usize,
    pub log_likelihood: f64,
    pub brier_score: f64,
}

impl FitSummary {
    pub fn to_file(&self) -> CoefficientsFile {
        CoefficientsFile {
            intercept: self.coefficients.intercept,
            slope: self.coefficients.slope,
            fit: Some(FitMetadata {
                games: self.games,
                iterations: self.iterations,
                log_likelihood: self.log_likelihood,
                brier_score: self.brier_score,
            }),
        }
    }
}

fn features(game: &HistoricalGame) -> (f64, f64) {
    let diff = to_log_odds(game.rating_a) - to_log_odds(game.rating_b);
    (favourite_sign(diff), diff)
}

/// Fit intercept and slope to historical outcomes.
pub fn fit_coefficients(games: &[HistoricalGame]) -> Result<FitSummary> {
    if games.len() < 2 {
        return Err(CalcuttaError::Fit(format!(
            "need at least 2 games, got {}",
            games.len()
        )));
    }
    if let Some(bad) = games
        .iter()
        .find(|g| !g.rating_a.is_finite() || !g.rating_b.is_finite())
    {
        return Err(CalcuttaError::Fit(format!(
            "non-finite rating in {} game",
            bad.year
        )));
    }

    let rows: Vec<(f64, f64, f64)> = games
        .iter()
        .map(|g| {
            let (s, d) = features(g);
            (s, d, if g.a_won { 1.0 } else { 0.0 })
        })
        .collect();

    let mut theta = Coefficients::new(0.0, 1.0);
    for iteration in 1..=MAX_ITERATIONS {
        let (mut g0, mut g1) = (0.0, 0.0);
        let (mut h00, mut h01, mut h11) = (0.0, 0.0, 0.0);
        for &(s, d, y) in &rows {
            let p = logistic(theta.intercept * s + theta.slope * d);
            let w = p * (1.0 - p);
            g0 += (y - p) * s;
            g1 += (y - p) * d;
            h00 += w * s * s;
            h01 += w * s * d;
            h11 += w * d * d;
        }

        let det = h00 * h11 - h01 * h01;
        if !(det.abs() > MIN_DETERMINANT) {
            return Err(CalcuttaError::Fit(format!(
                "information matrix is singular at iteration {iteration} (det = {det:e})"
            )));
        }
        let step0 = (h11 * g0 - h01 * g1) / det;
        let step1 = (h00 * g1 - h01 * g0) / det;
        theta = Coefficients::new(theta.intercept + step0, theta.slope + step1);
        if !theta.intercept.is_finite() || !theta.slope.is_finite() {
            return Err(CalcuttaError::Fit("diverged".to_string()));
        }
        debug!(iteration, intercept = theta.intercept, slope = theta.slope, "newton step");

        if step0.abs().max(step1.abs()) < TOLERANCE {
            let summary = summarize(games, theta, iteration);
            info!(
                games = summary.games,
                iterations = iteration,
                intercept = theta.intercept,
                slope = theta.slope,
                log_likelihood = summary.log_likelihood,
                "coefficient fit converged"
            );
            return Ok(summary);
        }
    }

    Err(CalcuttaError::Fit(format!(
        "no convergence after {MAX_ITERATIONS} iterations (outcomes may be perfectly separated)"
    )))
}

fn summarize(
    games: &[HistoricalGame],
    coefficients: Coefficients,
    iterations: usize,
) -> FitSummary {
    let mut log_likelihood = 0.0;
    let mut squared_error = 0.0;
    for game in games {
        let p = logistic(linear_predictor(game.rating_a, game.rating_b, &coefficients));
        let y = if game.a_won { 1.0 } else { 0.0 };
        log_likelihood += if game.a_won { p.ln() } else { (1.0 - p).ln() };
        squared_error += (p - y) * (p - y);
    }
    FitSummary {
        coefficients,
        games: games.len(),
        iterations,
        log_likelihood,
        brier_score: squared_error / games.len() as f64,
    }
}
