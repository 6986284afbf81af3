//! Ratings table input: `year,region,seed,team,rating` rows, one per slot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::error::{CalcuttaError, Result};
use crate::region::{Bracket, Region};
use crate::team::TeamSlot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub year: u16,
    pub region: String,
    pub seed: u8,
    pub team: String,
    pub rating: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RatingsTable {
    rows: Vec<RatingRow>,
}

impl RatingsTable {
    pub fn new(rows: Vec<RatingRow>) -> Self {
        RatingsTable { rows }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CalcuttaError::io(path, e))?;
        let table = Self::from_reader(file)?;
        info!(path = %path.display(), rows = table.rows.len(), "loaded ratings table");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rows = csv
            .deserialize::<RatingRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(RatingsTable { rows })
    }

    pub fn rows(&self) -> &[RatingRow] {
        &self.rows
    }

    /// Years present in the table, ascending.
    pub fn years(&self) -> Vec<u16> {
        let mut years: Vec<u16> = self.rows.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Assemble the bracket for `year`.
    ///
    /// Regions keep the order they first appear in. Missing seeds are filled
    /// from the seed-default table and flagged on the slot.
    pub fn bracket_for_year(&self, year: u16) -> Result<Bracket> {
        let mut region_names: Vec<&str> = Vec::new();
        let mut seen: HashSet<(&str, u8)> = HashSet::new();

        for row in self.rows.iter().filter(|r| r.year == year) {
            if !seen.insert((row.region.as_str(), row.seed)) {
                return Err(CalcuttaError::DuplicateSeed {
                    year,
                    region: row.region.clone(),
                    seed: row.seed,
                });
            }
            if !region_names.contains(&row.region.as_str()) {
                region_names.push(&row.region);
            }
        }
        if region_names.is_empty() {
            return Err(CalcuttaError::InvalidBracket(format!("no ratings for {year}")));
        }

        let regions = region_names
            .iter()
            .map(|&name| {
                let slots = self
                    .rows
                    .iter()
                    .filter(|r| r.year == year && r.region == name)
                    .map(|r| TeamSlot::new(r.seed, r.team.clone(), r.rating))
                    .collect::<Result<Vec<_>>>()?;
                Region::from_slots(name, slots)
            })
            .collect::<Result<Vec<_>>>()?;

        Bracket::new(regions)
    }
}
