// ============================================================================
// Fixed-Point Math - Pari-mutuel Prediction Market
// ============================================================================
//
// Integer helpers for 18-decimal amounts. Every product that can exceed
// u128 goes through `mul_div`, which keeps a 256-bit intermediate, so a
// large pool times a large share count never silently wraps.
//
// ============================================================================

use crate::models::{Amount, Bps, BPS_DENOMINATOR, WAD};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Number of decimal places in a fixed-point amount
pub const AMOUNT_DECIMALS: u32 = 18;

/// floor(a * b / c) with a 256-bit intermediate product.
///
/// Returns `None` when `c == 0` or the quotient does not fit in u128.
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(c);
    u128::try_from(quotient).ok()
}

/// a * b <= c * d, compared exactly
pub fn product_le(a: u128, b: u128, c: u128, d: u128) -> bool {
    U256::from(a) * U256::from(b) <= U256::from(c) * U256::from(d)
}

/// amount * bps / 10000, truncated toward zero
pub fn apply_bps(amount: Amount, bps: Bps) -> Option<Amount> {
    mul_div(amount, bps as u128, BPS_DENOMINATOR as u128)
}

/// Cost in currency of `shares` at `price_per_share` (both fixed point)
pub fn share_cost(shares: Amount, price_per_share: Amount) -> Option<Amount> {
    mul_div(shares, price_per_share, WAD)
}

/// Currency-per-share price equivalent of a bps quote
pub fn bps_to_price(bps: Bps) -> Amount {
    (bps as u128) * WAD / BPS_DENOMINATOR as u128
}

/// Whole units to fixed point (`units(5)` = 5 * 10^18)
pub const fn units(whole: u128) -> Amount {
    whole * WAD
}

// ============================================================================
// DECIMAL CONVERSION
// ============================================================================

/// Render a fixed-point amount as a decimal for logs and views.
///
/// Falls back to the whole-unit part when the value exceeds Decimal's
/// 96-bit mantissa.
pub fn to_decimal(amount: Amount) -> Decimal {
    match i128::try_from(amount)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, AMOUNT_DECIMALS).ok())
    {
        Some(d) => d.normalize(),
        None => Decimal::from_i128_with_scale((amount / WAD).min(i64::MAX as u128) as i128, 0),
    }
}

/// Convert a decimal (e.g. `0.01`) into fixed point, truncating extra digits
pub fn from_decimal(value: Decimal) -> Option<Amount> {
    if value.is_sign_negative() {
        return None;
    }
    let whole = value.trunc();
    let frac = value - whole;
    let whole_units = u128::try_from(whole.mantissa() / 10i128.pow(whole.scale())).ok()?;
    let frac_scaled = (frac * Decimal::from(1_000_000_000_000_000_000u64)).trunc();
    let frac_units = u128::try_from(frac_scaled.mantissa() / 10i128.pow(frac_scaled.scale())).ok()?;
    whole_units.checked_mul(WAD)?.checked_add(frac_units)
}

/// Parse a decimal string (e.g. `"0.01"`) into fixed point
pub fn parse_decimal(text: &str) -> Option<Amount> {
    Decimal::from_str(text.trim()).ok().and_then(from_decimal)
}

// ============================================================================
// TESTS
// ============================================================================
