use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coefficients::{load_coefficients, LoadedCoefficients};
use crate::config::EngineConfig;
use crate::error::{CalcuttaError, Result};
use crate::payout::{compute_ev, PayoutTable};
use crate::propagate::{PropagationParams, Propagator, RoundProbabilities};
use crate::region::{Bracket, Region, RegionRatings};
use crate::team::{RatingSource, TeamSlot};
use crate::topology::{validate_seed, BracketTopology, Round, REGIONS, ROUNDS, SEEDS};
use crate::win_prob::Coefficients;

/// Default allowed gap between the computed total and the full pool.
pub const DEFAULT_POOL_TOLERANCE: f64 = 0.03;

/// Scored slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamEv {
    pub seed: u8,
    pub name: String,
    pub rating: f64,
    pub source: RatingSource,
    pub rounds: RoundProbabilities,
    /// Expected pool fraction.
    pub ev: f64,
}

impl TeamEv {
    pub fn ev_percent(&self) -> f64 {
        self.ev * 100.0
    }

    pub fn expected_payout(&self, pool_size: f64) -> f64 {
        self.ev * pool_size
    }
}

/// Outcome of comparing a computed EV total against what it should be.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolValidation {
    pub total: f64,
    pub expected: f64,
    pub deviation: f64,
    pub tolerance: f64,
    pub within_tolerance: bool,
}

impl PoolValidation {
    pub fn new(total: f64, expected: f64, tolerance: f64) -> Self {
        let deviation = total - expected;
        PoolValidation {
            total,
            expected,
            deviation,
            tolerance,
            within_tolerance: deviation.abs() <= tolerance,
        }
    }
}

/// All 16 scored slots of one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionEv {
    pub name: String,
    pub teams: Vec<TeamEv>,
    /// Sum of the 16 EVs. A region holds a quarter of the pool.
    pub total_ev: f64,
}

impl RegionEv {
    pub fn team(&self, seed: u8) -> Option<&TeamEv> {
        self.teams.iter().find(|t| t.seed == seed)
    }

    /// The region total scaled to the whole bracket.
    pub fn projected_pool_share(&self) -> f64 {
        self.total_ev * REGIONS as f64
    }

    pub fn validate(&self, tolerance: f64) -> PoolValidation {
        PoolValidation::new(self.projected_pool_share(), 1.0, tolerance)
    }
}

/// Scored bracket with provenance and the pool check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BracketEv {
    pub regions: Vec<RegionEv>,
    pub coefficients: LoadedCoefficients,
    pub total_ev: f64,
    pub validation: PoolValidation,
}

impl BracketEv {
    pub fn region(&self, name: &str) -> Option<&RegionEv> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn team(&self, region: &str, seed: u8) -> Result<&TeamEv> {
        self.region(region)
            .and_then(|r| r.team(seed))
            .ok_or_else(|| CalcuttaError::UnknownSlot {
                region: region.to_string(),
                seed,
            })
    }

    /// Expected number of winners per round across the bracket.
    ///
    /// Exact rounds give 32, 16 and 8; the approximated rounds drift.
    pub fn round_totals(&self) -> [f64; ROUNDS] {
        let mut totals = [0.0; ROUNDS];
        for team in self.regions.iter().flat_map(|r| &r.teams) {
            for (t, p) in totals.iter_mut().zip(team.rounds.as_array()) {
                *t += p;
            }
        }
        totals
    }

    /// Slots whose rating was substituted from the seed-default table.
    pub fn defaulted_slots(&self) -> Vec<(&str, u8)> {
        self.regions
            .iter()
            .flat_map(|r| {
                r.teams
                    .iter()
                    .filter(|t| t.source == RatingSource::SeedDefault)
                    .map(move |t| (r.name.as_str(), t.seed))
            })
            .collect()
    }
}

/// Model, approximations and payout schedule used to score brackets.
#[derive(Clone, Debug)]
pub struct EvEngine {
    pub coefficients: LoadedCoefficients,
    pub params: PropagationParams,
    pub payout: PayoutTable,
    pub topology: BracketTopology,
    pub pool_tolerance: f64,
}

impl EvEngine {
    pub fn new(coefficients: LoadedCoefficients) -> Self {
        EvEngine {
            coefficients,
            params: PropagationParams::default(),
            payout: PayoutTable::default(),
            topology: BracketTopology::standard(),
            pool_tolerance: DEFAULT_POOL_TOLERANCE,
        }
    }

    /// Build from configuration, loading coefficients from the configured path.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let coefficients = load_coefficients(config.model.coefficients_path.as_deref())?;
        Ok(EvEngine {
            coefficients,
            params: config.propagation,
            payout: config.payout,
            topology: BracketTopology::standard(),
            pool_tolerance: config.validation.pool_tolerance,
        })
    }

    pub fn with_params(mut self, params: PropagationParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn with_payout(mut self, payout: PayoutTable) -> Result<Self> {
        payout.validate()?;
        self.payout = payout;
        Ok(self)
    }

    pub fn with_topology(mut self, topology: BracketTopology) -> Self {
        self.topology = topology;
        self
    }

    fn propagator(&self) -> Propagator<'_> {
        Propagator::new(&self.coefficients.coefficients, &self.params, &self.topology)
    }

    pub fn round_probabilities(
        &self,
        seed: u8,
        rating: f64,
        ratings: &RegionRatings,
    ) -> Result<RoundProbabilities> {
        self.propagator().round_probabilities(seed, rating, ratings)
    }

    fn score_slot(&self, slot: &TeamSlot, ratings: &RegionRatings) -> Result<TeamEv> {
        let rounds = self.round_probabilities(slot.seed, slot.rating, ratings)?;
        let ev = compute_ev(&rounds, &self.payout);
        debug!(seed = slot.seed, team = %slot.name, ev, "scored slot");
        Ok(TeamEv {
            seed: slot.seed,
            name: slot.name.clone(),
            rating: slot.rating,
            source: slot.source,
            rounds,
            ev,
        })
    }

    fn score_slots(&self, name: &str, slots: &[TeamSlot]) -> Result<RegionEv> {
        if slots.len() != SEEDS {
            return Err(CalcuttaError::InvalidBracket(format!(
                "region {name} has {} slots",
                slots.len()
            )));
        }
        let mut ratings = [None; SEEDS];
        for slot in slots {
            let entry = &mut ratings[validate_seed(slot.seed)? as usize - 1];
            if entry.replace(slot.rating).is_some() {
                return Err(CalcuttaError::InvalidBracket(format!(
                    "region {name} has seed {} twice",
                    slot.seed
                )));
            }
        }
        // 16 slots with no repeats cover every seed.
        let ratings = RegionRatings::new(ratings.map(|r| r.unwrap_or_default()));

        // Every slot reads the same ratings map, so the order of work is free.
        let teams = slots
            .par_iter()
            .map(|slot| self.score_slot(slot, &ratings))
            .collect::<Result<Vec<_>>>()?;
        let total_ev = teams.iter().map(|t| t.ev).sum();

        Ok(RegionEv {
            name: name.to_string(),
            teams,
            total_ev,
        })
    }

    /// Score all 16 seeds of a region given only its ratings.
    pub fn compute_region_ev(&self, ratings: &RegionRatings) -> Result<RegionEv> {
        let slots = (1..=SEEDS as u8)
            .map(|seed| TeamSlot::new(seed, format!("{seed}-seed"), ratings.get(seed)?))
            .collect::<Result<Vec<_>>>()?;
        self.score_slots("region", &slots)
    }

    pub fn evaluate_region(&self, region: &Region) -> Result<RegionEv> {
        self.score_slots(&region.name, region.slots())
    }

    /// Score every slot in the bracket, regions in parallel, and check the
    /// total against the full pool.
    pub fn compute_bracket_ev(&self, bracket: &Bracket) -> Result<BracketEv> {
        let regions = bracket
            .regions
            .par_iter()
            .map(|region| self.evaluate_region(region))
            .collect::<Result<Vec<_>>>()?;

        let total_ev: f64 = regions.iter().map(|r| r.total_ev).sum();
        let validation = PoolValidation::new(total_ev, 1.0, self.pool_tolerance);
        if validation.within_tolerance {
            info!(total_ev, "bracket EV computed");
        } else {
            warn!(
                total_ev,
                deviation = validation.deviation,
                tolerance = validation.tolerance,
                "bracket EV deviates from the full pool"
            );
        }

        Ok(BracketEv {
            regions,
            coefficients: self.coefficients.clone(),
            total_ev,
            validation,
        })
    }
}

impl Default for EvEngine {
    fn default() -> Self {
        EvEngine::new(LoadedCoefficients::theoretical("default engine"))
    }
}

/// Score one region with default approximations and payouts.
pub fn compute_region_ev(ratings: &RegionRatings, coefficients: &Coefficients) -> Result<RegionEv> {
    EvEngine::new(LoadedCoefficients::supplied(*coefficients)).compute_region_ev(ratings)
}

/// Per-round expected winners for a region, for diagnostics.
pub fn region_round_totals(region: &RegionEv) -> [f64; ROUNDS] {
    let mut totals = [0.0; ROUNDS];
    for team in &region.teams {
        for round in Round::ALL {
            totals[round.index()] += team.rounds.get(round);
        }
    }
    totals
}
