//! Calcutta Core - bracket-aware expected value for NCAA Calcutta auctions.
//!
//! Given a fitted win-probability model and the ratings of every seed in a
//! region, this library propagates round-by-round advancement probabilities
//! through the single-elimination bracket and converts them into each slot's
//! expected share of the prize pool. Python bindings are available behind the
//! `python` feature.

pub mod coefficients;
pub mod config;
pub mod error;
pub mod fit;
pub mod market;
pub mod payout;
pub mod propagate;
pub mod ratings;
pub mod region;
pub mod team;
pub mod topology;
pub mod tournament;
pub mod win_prob;

#[cfg(feature = "python")]
mod python;

pub use coefficients::{load_coefficients, CoefficientSource, LoadedCoefficients};
pub use config::EngineConfig;
pub use error::{CalcuttaError, Result};
pub use fit::{fit_coefficients, FitSummary, HistoricalGame};
pub use market::{project_pool_size, value_slots, SlotId, SlotValuation};
pub use payout::{compute_ev, PayoutTable, DEFAULT_ROUND_PAYOUTS};
pub use propagate::{compute_round_probabilities, PropagationParams, Propagator, RoundProbabilities};
pub use ratings::RatingsTable;
pub use region::{Bracket, Region, RegionRatings};
pub use team::{RatingSource, TeamSlot};
pub use topology::{
    first_round_opponent, fourth_round_opponents, second_round_opponents, third_round_opponents,
    BracketTopology, Round, DEFAULT_SEED_RATINGS,
};
pub use tournament::{compute_region_ev, BracketEv, EvEngine, PoolValidation, RegionEv, TeamEv};
pub use win_prob::{to_log_odds, win_probability, Coefficients};
