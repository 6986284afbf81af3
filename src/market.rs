//! Valuing auction slots against live prices.
//!
//! Consumes scored brackets only; bidding strategy lives elsewhere.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CalcuttaError, Result};
use crate::tournament::BracketEv;

/// A (region, seed) slot in the auction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub region: String,
    pub seed: u8,
}

impl SlotId {
    pub fn new(region: impl Into<String>, seed: u8) -> Self {
        SlotId {
            region: region.into(),
            seed,
        }
    }
}

/// What a slot is worth at a given pool size and price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotValuation {
    pub slot: SlotId,
    pub team: String,
    /// Expected pool fraction.
    pub ev: f64,
    pub expected_payout: f64,
    pub price: f64,
    pub expected_profit: f64,
    /// Expected profit per unit paid; `None` for a zero price.
    pub roi: Option<f64>,
}

impl SlotValuation {
    /// The highest price at which the slot still breaks even.
    pub fn break_even_price(&self) -> f64 {
        self.expected_payout
    }
}

fn check_pool(pool_size: f64) -> Result<()> {
    if pool_size > 0.0 && pool_size.is_finite() {
        Ok(())
    } else {
        Err(CalcuttaError::InvalidParameter {
            name: "pool_size",
            reason: format!("must be positive, got {pool_size}"),
        })
    }
}

pub fn value_slot(
    bracket: &BracketEv,
    slot: &SlotId,
    pool_size: f64,
    price: f64,
) -> Result<SlotValuation> {
    check_pool(pool_size)?;
    let team = bracket.team(&slot.region, slot.seed)?;
    let expected_payout = team.expected_payout(pool_size);
    let expected_profit = expected_payout - price;
    Ok(SlotValuation {
        slot: slot.clone(),
        team: team.name.clone(),
        ev: team.ev,
        expected_payout,
        price,
        expected_profit,
        roi: (price > 0.0).then(|| expected_profit / price),
    })
}

/// Value many priced slots at once.
pub fn value_slots(
    bracket: &BracketEv,
    prices: &[(SlotId, f64)],
    pool_size: f64,
) -> Result<Vec<SlotValuation>> {
    prices
        .par_iter()
        .map(|(slot, price)| value_slot(bracket, slot, pool_size, *price))
        .collect()
}

/// Estimate the final pool from the slots sold so far.
///
/// Each sale reveals `price / ev` as a pool estimate; the sales are pooled by
/// dividing total spend by total EV sold.
pub fn project_pool_size(bracket: &BracketEv, sales: &[(SlotId, f64)]) -> Result<Option<f64>> {
    let mut spent = 0.0;
    let mut ev_sold = 0.0;
    for (slot, price) in sales {
        spent += price;
        ev_sold += bracket.team(&slot.region, slot.seed)?.ev;
    }
    Ok((ev_sold > 0.0).then(|| spent / ev_sold))
}

/// Expected payout of a set of owned slots.
pub fn holdings_expected_payout(
    bracket: &BracketEv,
    owned: &[SlotId],
    pool_size: f64,
) -> Result<f64> {
    check_pool(pool_size)?;
    owned.iter().try_fold(0.0, |acc, slot| {
        Ok(acc + bracket.team(&slot.region, slot.seed)?.expected_payout(pool_size))
    })
}
