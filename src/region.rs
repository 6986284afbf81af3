use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{CalcuttaError, Result};
use crate::team::TeamSlot;
use crate::topology::{validate_seed, DEFAULT_SEED_RATINGS, REGIONS, SEEDS};

/// Seed -> rating map for one region, read-only during propagation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionRatings([f64; SEEDS]);

impl RegionRatings {
    pub fn new(ratings: [f64; SEEDS]) -> Self {
        RegionRatings(ratings)
    }

    /// Every seed at its historical default.
    pub fn seed_defaults() -> Self {
        RegionRatings(DEFAULT_SEED_RATINGS)
    }

    /// Every seed at the same rating.
    pub fn uniform(rating: f64) -> Self {
        RegionRatings([rating; SEEDS])
    }

    /// Build from a partial map, filling gaps from the seed-default table.
    ///
    /// Returns the ratings and the seeds that were filled in.
    pub fn from_partial(ratings: &HashMap<u8, f64>) -> Result<(Self, Vec<u8>)> {
        let mut out = DEFAULT_SEED_RATINGS;
        for (&seed, &rating) in ratings {
            check_rating(validate_seed(seed)?, rating)?;
        }
        let mut defaulted = Vec::new();
        for seed in 1..=SEEDS as u8 {
            match ratings.get(&seed) {
                Some(&rating) => out[seed as usize - 1] = rating,
                None => defaulted.push(seed),
            }
        }
        if !defaulted.is_empty() {
            warn!(seeds = ?defaulted, "missing ratings replaced with seed defaults");
        }
        Ok((RegionRatings(out), defaulted))
    }

    pub fn get(&self, seed: u8) -> Result<f64> {
        Ok(self.0[validate_seed(seed)? as usize - 1])
    }

    pub fn with_rating(mut self, seed: u8, rating: f64) -> Result<Self> {
        self.0[validate_seed(seed)? as usize - 1] = check_rating(seed, rating)?;
        Ok(self)
    }

    /// Fails on the first seed whose rating is NaN or infinite.
    pub fn check_finite(&self) -> Result<()> {
        for (seed, &rating) in (1..=SEEDS as u8).zip(&self.0) {
            check_rating(seed, rating)?;
        }
        Ok(())
    }

    pub fn as_array(&self) -> &[f64; SEEDS] {
        &self.0
    }
}

pub(crate) fn check_rating(seed: u8, rating: f64) -> Result<f64> {
    if rating.is_finite() {
        Ok(rating)
    } else {
        Err(CalcuttaError::InvalidRating {
            team: format!("seed {seed}"),
            rating,
        })
    }
}

/// One 16-team region, slots ordered by seed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    slots: Vec<TeamSlot>,
}

impl Region {
    /// Build a region from the slots that are known. Missing seeds get
    /// default-rated placeholders; duplicate seeds are rejected.
    pub fn from_slots(name: impl Into<String>, slots: Vec<TeamSlot>) -> Result<Self> {
        let name = name.into();
        let mut by_seed: Vec<Option<TeamSlot>> = vec![None; SEEDS];
        for slot in slots {
            let i = validate_seed(slot.seed)? as usize - 1;
            if by_seed[i].is_some() {
                return Err(CalcuttaError::InvalidBracket(format!(
                    "region {name} lists seed {} twice",
                    slot.seed
                )));
            }
            by_seed[i] = Some(slot);
        }

        let mut filled = Vec::with_capacity(SEEDS);
        let mut defaulted = Vec::new();
        for (i, slot) in by_seed.into_iter().enumerate() {
            let slot = match slot {
                Some(slot) => slot,
                None => {
                    defaulted.push(i as u8 + 1);
                    TeamSlot::seed_default(i as u8 + 1)?
                }
            };
            filled.push(slot);
        }
        if !defaulted.is_empty() {
            warn!(
                region = %name,
                seeds = ?defaulted,
                "missing ratings replaced with seed defaults"
            );
        }

        Ok(Region {
            name,
            slots: filled,
        })
    }

    /// A region made entirely of seed-default placeholders.
    pub fn seed_defaults(name: impl Into<String>) -> Result<Self> {
        let slots = (1..=SEEDS as u8)
            .map(TeamSlot::seed_default)
            .collect::<Result<Vec<_>>>()?;
        Ok(Region {
            name: name.into(),
            slots,
        })
    }

    pub fn slots(&self) -> &[TeamSlot] {
        &self.slots
    }

    pub fn slot(&self, seed: u8) -> Result<&TeamSlot> {
        self.slots
            .get(validate_seed(seed)? as usize - 1)
            .ok_or_else(|| CalcuttaError::UnknownSlot {
                region: self.name.clone(),
                seed,
            })
    }

    pub fn ratings(&self) -> RegionRatings {
        let mut ratings = [0.0; SEEDS];
        for (out, slot) in ratings.iter_mut().zip(&self.slots) {
            *out = slot.rating;
        }
        RegionRatings(ratings)
    }

    pub fn defaulted_seeds(&self) -> Vec<u8> {
        self.slots
            .iter()
            .filter(|s| s.is_default())
            .map(|s| s.seed)
            .collect()
    }
}

/// Four regions making up one tournament instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bracket {
    pub regions: Vec<Region>,
}

impl Bracket {
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        if regions.len() != REGIONS {
            return Err(CalcuttaError::InvalidBracket(format!(
                "expected {REGIONS} regions, found {}",
                regions.len()
            )));
        }
        for (i, region) in regions.iter().enumerate() {
            if regions[..i].iter().any(|r| r.name == region.name) {
                return Err(CalcuttaError::InvalidBracket(format!(
                    "region {} appears twice",
                    region.name
                )));
            }
        }
        Ok(Bracket { regions })
    }

    /// A bracket with every slot at its seed default.
    pub fn seed_defaults() -> Result<Self> {
        let regions = ["East", "West", "South", "Midwest"]
            .into_iter()
            .map(Region::seed_defaults)
            .collect::<Result<Vec<_>>>()?;
        Bracket::new(regions)
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::RatingSource;

    #[test]
    fn test_from_partial_fills_defaults() {
        let ratings: HashMap<u8, f64> = [(1, 0.98), (16, 0.55)].into_iter().collect();
        let (region, defaulted) = RegionRatings::from_partial(&ratings).unwrap();

        assert_eq!(region.get(1).unwrap(), 0.98);
        assert_eq!(region.get(16).unwrap(), 0.55);
        assert_eq!(region.get(5).unwrap(), DEFAULT_SEED_RATINGS[4]);
        assert_eq!(defaulted.len(), 14);
        assert!(!defaulted.contains(&1));
    }

    #[test]
    fn test_from_partial_rejects_bad_seed() {
        let ratings: HashMap<u8, f64> = [(17, 0.5)].into_iter().collect();
        assert!(RegionRatings::from_partial(&ratings).is_err());
    }

    #[test]
    fn test_non_finite_ratings_rejected() {
        let ratings: HashMap<u8, f64> = [(1, f64::NAN)].into_iter().collect();
        assert!(matches!(
            RegionRatings::from_partial(&ratings),
            Err(CalcuttaError::InvalidRating { .. })
        ));
        assert!(matches!(
            RegionRatings::seed_defaults().with_rating(4, f64::INFINITY),
            Err(CalcuttaError::InvalidRating { .. })
        ));

        let mut raw = DEFAULT_SEED_RATINGS;
        raw[6] = f64::NAN;
        let err = RegionRatings::new(raw).check_finite().unwrap_err();
        assert!(matches!(err, CalcuttaError::InvalidRating { ref team, .. } if team == "seed 7"));
        assert!(RegionRatings::seed_defaults().check_finite().is_ok());
    }

    #[test]
    fn test_slot_lookup_on_short_region() {
        let mut region = Region::seed_defaults("West").unwrap();
        region.slots.truncate(4);
        assert!(region.slot(4).is_ok());
        assert!(matches!(
            region.slot(12),
            Err(CalcuttaError::UnknownSlot { seed: 12, .. })
        ));
    }

    #[test]
    fn test_region_fills_missing_slots() {
        let slots = vec![
            TeamSlot::new(1, "Houston", 0.97).unwrap(),
            TeamSlot::new(16, "Longwood", 0.52).unwrap(),
        ];
        let region = Region::from_slots("South", slots).unwrap();

        assert_eq!(region.slots().len(), 16);
        assert_eq!(region.slot(1).unwrap().name, "Houston");
        assert_eq!(region.slot(2).unwrap().source, RatingSource::SeedDefault);
        assert_eq!(region.defaulted_seeds().len(), 14);
        assert_eq!(region.ratings().get(16).unwrap(), 0.52);
    }

    #[test]
    fn test_region_rejects_duplicate_seed() {
        let slots = vec![
            TeamSlot::new(1, "Houston", 0.97).unwrap(),
            TeamSlot::new(1, "Alabama", 0.96).unwrap(),
        ];
        assert!(matches!(
            Region::from_slots("South", slots),
            Err(CalcuttaError::InvalidBracket(_))
        ));
    }

    #[test]
    fn test_bracket_requires_four_distinct_regions() {
        let east = Region::seed_defaults("East").unwrap();
        assert!(Bracket::new(vec![east.clone()]).is_err());
        assert!(Bracket::new(vec![east.clone(), east.clone(), east.clone(), east]).is_err());
        assert_eq!(Bracket::seed_defaults().unwrap().regions.len(), 4);
    }
}
