use serde::{Deserialize, Serialize};

use crate::error::{CalcuttaError, Result};
use crate::propagate::RoundProbabilities;
use crate::topology::{Round, ROUNDS};

/// Fraction of the pool paid to each winner of a round, on top of earlier
/// rounds. Nothing is paid for the first round.
pub const DEFAULT_ROUND_PAYOUTS: [f64; ROUNDS] = [0.0, 0.015, 0.015, 0.05, 0.12, 0.20];

/// Incremental per-round payouts as pool fractions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutTable {
    pub rounds: [f64; ROUNDS],
}

impl PayoutTable {
    pub fn new(rounds: [f64; ROUNDS]) -> Result<Self> {
        let table = PayoutTable { rounds };
        table.validate()?;
        Ok(table)
    }

    pub fn incremental(&self, round: Round) -> f64 {
        self.rounds[round.index()]
    }

    /// Total paid to a team that wins every round through `round`.
    pub fn cumulative(&self, round: Round) -> f64 {
        self.rounds[..=round.index()].iter().sum()
    }

    /// Share of the pool the table distributes across all 63 games.
    pub fn distributed(&self) -> f64 {
        Round::ALL
            .iter()
            .map(|r| r.winners() as f64 * self.incremental(*r))
            .sum()
    }

    /// The table must pay out exactly the whole pool.
    pub fn validate(&self) -> Result<()> {
        if self.rounds.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(CalcuttaError::InvalidParameter {
                name: "payout",
                reason: format!("round payouts must be non-negative, got {:?}", self.rounds),
            });
        }
        let total = self.distributed();
        if (total - 1.0).abs() > 1e-9 {
            return Err(CalcuttaError::PayoutTable { total });
        }
        Ok(())
    }
}

impl Default for PayoutTable {
    fn default() -> Self {
        PayoutTable {
            rounds: DEFAULT_ROUND_PAYOUTS,
        }
    }
}

/// Expected pool fraction earned by a slot.
pub fn compute_ev(probs: &RoundProbabilities, payout: &PayoutTable) -> f64 {
    probs
        .as_array()
        .iter()
        .zip(payout.rounds.iter())
        .map(|(p, pay)| p * pay)
        .sum()
}
