//! # Timelock Planning
//!
//! Suggested timelocks for a new trade and the ordering check applied when
//! the second leg is prepared.

use crate::config::ProtocolConfig;
use crate::domain::{invariant_timelock_ordering, ChainSide, SwapError, Trade};

/// Suggested `(first, second)` timelocks for a trade authored at `now`.
///
/// The second leg never gets more than `first - margin`.
pub fn calculate_timelocks(config: &ProtocolConfig, now: u64) -> (u64, u64) {
    let first = now.saturating_add(config.default_initial_timeout_secs);
    let counter = now.saturating_add(config.default_counter_timeout_secs);
    let latest_second = first.saturating_sub(config.min_timelock_margin_secs);
    (first, counter.min(latest_second))
}

/// Check that preparing `side` keeps the timelock ordering.
///
/// Always passes while no leg is prepared, or when `side` is the leg that
/// was prepared first.
pub fn validate_swap_timelocks(
    trade: &Trade,
    side: ChainSide,
    config: &ProtocolConfig,
) -> Result<(), SwapError> {
    match trade.initial_side {
        Some(first) if first != side => invariant_timelock_ordering(
            trade.leg(first).timelock,
            trade.leg(side).timelock,
            config.min_timelock_margin_secs,
        ),
        _ => Ok(()),
    }
}
