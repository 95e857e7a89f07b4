//! Market selection rules
//!
//! Pure functions used by the market-lifecycle flow to choose which market and which
//! outcome side to trade, and how large the order must be.

use std::fmt;

use crate::metadata_client::{Market, Orderbook, PriceLevel};

/// Outcome token side of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSide {
    Yes,
    No,
}

impl fmt::Display for OutcomeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeSide::Yes => write!(f, "YES"),
            OutcomeSide::No => write!(f, "NO"),
        }
    }
}

/// Fold step of `select_most_active_market`: keeps the current pick unless `candidate`
/// is active with strictly higher volume.
pub fn keep_more_active(best: Option<Market>, candidate: Market) -> Option<Market> {
    if !candidate.is_active() {
        return best;
    }
    match best {
        Some(current) if current.volume() >= candidate.volume() => Some(current),
        _ => Some(candidate),
    }
}

/// Picks the active market with the highest volume; the first one seen wins ties.
pub fn select_most_active_market<I>(markets: I) -> Option<Market>
where
    I: IntoIterator<Item = Market>,
{
    markets.into_iter().fold(None, keep_more_active)
}

/// Highest bid price on one side, if any.
pub fn best_bid(bids: &[PriceLevel]) -> Option<f64> {
    bids.iter().map(|level| level.price).reduce(f64::max)
}

/// Side with the lower best bid.
///
/// This is a "buy the cheaper leg" heuristic, not a pricing model: YES and NO bids are
/// complementary probabilities and are compared without normalization. A side without
/// bids cannot be selected; equal prices pick YES.
pub fn cheaper_side(orderbook: &Orderbook) -> Option<OutcomeSide> {
    match (best_bid(&orderbook.yes_bids), best_bid(&orderbook.no_bids)) {
        (Some(yes), Some(no)) if no < yes => Some(OutcomeSide::No),
        (Some(_), Some(_)) => Some(OutcomeSide::Yes),
        (Some(_), None) => Some(OutcomeSide::Yes),
        (None, Some(_)) => Some(OutcomeSide::No),
        (None, None) => None,
    }
}

/// Input amount that should yield `target_out`, given a probe of `probe_in` that
/// returned `probe_out`: `ceil(target_out * probe_in / probe_out)`.
///
/// Returns `None` when the probe produced nothing or the result does not fit in `u64`.
pub fn scale_to_target(target_out: u64, probe_in: u64, probe_out: u64) -> Option<u64> {
    if probe_out == 0 {
        return None;
    }
    let numerator = u128::from(target_out) * u128::from(probe_in);
    let denominator = u128::from(probe_out);
    let scaled = (numerator + denominator - 1) / denominator;
    u64::try_from(scaled).ok()
}
