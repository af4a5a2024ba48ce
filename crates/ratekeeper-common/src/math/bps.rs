//! Basis-point arithmetic (10000 bps = 100%)

/// Denominator of a basis-point ratio
pub const BPS_DENOMINATOR: u128 = 10_000;

/// `value * bps / 10000`, truncating, saturating at `u128::MAX`.
///
/// Splits `value` into quotient and remainder by the denominator so the
/// intermediate product never needs more than 128 bits when the exact
/// result fits.
pub fn apply_bps(value: u128, bps: u32) -> u128 {
    let bps = bps as u128;
    let quotient = value / BPS_DENOMINATOR;
    let remainder = value % BPS_DENOMINATOR;

    quotient
        .checked_mul(bps)
        .and_then(|q| q.checked_add(remainder * bps / BPS_DENOMINATOR))
        .unwrap_or(u128::MAX)
}
