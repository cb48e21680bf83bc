//! Tiered platform commission.
//!
//! Sales at or below 1000.00 currency units pay 7%, anything above pays 6%.
//! All arithmetic is integer basis points over cents; the commission is
//! rounded half up and the net is derived by subtraction, so the breakdown
//! always sums back to the price exactly.

use serde::{Deserialize, Serialize};

/// Tier boundary in cents (1000.00 currency units).
pub const COMMISSION_THRESHOLD_CENTS: u64 = 100_000;

/// Commission rate below/at the threshold, in basis points.
pub const RATE_LOW_BPS: u64 = 700;

/// Commission rate above the threshold, in basis points.
pub const RATE_HIGH_BPS: u64 = 600;

/// The fee breakdown for one sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub rate_bps: u64,
    pub commission_cents: u64,
    pub net_cents: u64,
}

/// Rate applied to a given price, in basis points.
pub fn rate_bps_for(price_cents: u64) -> u64 {
    if price_cents <= COMMISSION_THRESHOLD_CENTS {
        RATE_LOW_BPS
    } else {
        RATE_HIGH_BPS
    }
}

/// Compute the commission breakdown for a price.
///
/// Returns `None` for a zero price: the caller treats that as "no price
/// entered" and must not proceed to order creation.
pub fn commission_for(price_cents: u64) -> Option<CommissionBreakdown> {
    if price_cents == 0 {
        return None;
    }
    let rate_bps = rate_bps_for(price_cents);
    // Round half up; widen to u128 so large prices cannot overflow.
    let commission_cents =
        ((price_cents as u128 * rate_bps as u128 + 5_000) / 10_000) as u64;
    Some(CommissionBreakdown {
        rate_bps,
        commission_cents,
        net_cents: price_cents - commission_cents,
    })
}
