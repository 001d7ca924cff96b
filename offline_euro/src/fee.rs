//! Holding and transfer fees. All arithmetic is in integer basis points so that every holder
//! computes exactly the same value from `(received timestamp, transfer count)`.

use crate::config::{FeeConfig, BASIS_POINTS};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const MILLIS_PER_HOUR: u64 = 60 * 60 * 1000;
pub const HOURS_PER_DAY: u64 = 24;

/// `min(base + (hours_held / 24) * per_day + transfer_count * per_transfer, cap)`
pub fn fee_basis_points(fees: &FeeConfig, hours_held: u64, transfer_count: u64) -> u64 {
    let days = hours_held / HOURS_PER_DAY;
    fees.base_bp
        .saturating_add(days.saturating_mul(fees.per_day_bp))
        .saturating_add(transfer_count.saturating_mul(fees.per_transfer_bp))
        .min(fees.cap_bp)
}

/// `floor(amount * (1 - fee))`
pub fn value_after_fee(amount: u64, fee_bp: u64) -> u64 {
    let kept = BASIS_POINTS - fee_bp.min(BASIS_POINTS);
    (u128::from(amount) * u128::from(kept) / u128::from(BASIS_POINTS)) as u64
}

/// Whole hours from `from_ms` to `to_ms`, 0 if `to_ms` is earlier
pub fn whole_hours_between(from_ms: u64, to_ms: u64) -> u64 {
    to_ms.saturating_sub(from_ms) / MILLIS_PER_HOUR
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or_default()
}

/// Saturates at `u64::MAX`
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
