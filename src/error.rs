use std::path::PathBuf;

use crate::topology::Round;

/// Errors produced by the EV engine and its loaders.
#[derive(Debug, thiserror::Error)]
pub enum CalcuttaError {
    #[error("seed {0} is outside 1..=16")]
    InvalidSeed(u8),

    /// Opponent table has the wrong branching factor. Always a table bug.
    #[error("topology for seed {seed} in {round}: expected {expected} opponents, found {found}")]
    Topology {
        round: Round,
        seed: u8,
        expected: usize,
        found: usize,
    },

    #[error("malformed topology: {0}")]
    MalformedTopology(String),

    #[error("{0} is played across regions and has no regional opponent table")]
    CrossRegionRound(Round),

    #[error("invalid bracket: {0}")]
    InvalidBracket(String),

    #[error("duplicate entry for {region} seed {seed} in {year}")]
    DuplicateSeed { year: u16, region: String, seed: u8 },

    #[error("rating for {team} must be finite, got {rating}")]
    InvalidRating { team: String, rating: f64 },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("payout table distributes {total:.6} of the pool, expected 1.0")]
    PayoutTable { total: f64 },

    #[error("coefficient fit failed: {0}")]
    Fit(String),

    #[error("no EV computed for {region} seed {seed}")]
    UnknownSlot { region: String, seed: u8 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CalcuttaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CalcuttaError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcuttaError>;
