use serde::{Deserialize, Serialize};

use crate::error::{CalcuttaError, Result};
use crate::topology::{default_rating, validate_seed};

/// Where a slot's rating came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingSource {
    /// Read from the ratings table.
    Reported,
    /// Missing from the table; the historical seed average was substituted.
    SeedDefault,
}

/// One seed slot in a region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamSlot {
    pub seed: u8,
    pub name: String,
    /// Strength rating in (0,1). Out-of-range values are clamped by the model.
    pub rating: f64,
    pub source: RatingSource,
}

impl TeamSlot {
    pub fn new(seed: u8, name: impl Into<String>, rating: f64) -> Result<Self> {
        let name = name.into();
        if !rating.is_finite() {
            return Err(CalcuttaError::InvalidRating { team: name, rating });
        }
        Ok(TeamSlot {
            seed: validate_seed(seed)?,
            name,
            rating,
            source: RatingSource::Reported,
        })
    }

    /// Placeholder slot carrying the historical rating for `seed`.
    pub fn seed_default(seed: u8) -> Result<Self> {
        Ok(TeamSlot {
            seed,
            name: format!("{seed}-seed (default)"),
            rating: default_rating(seed)?,
            source: RatingSource::SeedDefault,
        })
    }

    pub fn is_default(&self) -> bool {
        self.source == RatingSource::SeedDefault
    }
}
