//! # Bin Math
//!
//! Conversions between human prices and bin ids. A bin id `b` represents the
//! raw price `(1 + bin_step / 10000)^b`, measured in raw units of the second
//! token per raw unit of the first token.
//!
//! The human-facing conversions go through `f64` only for the logarithm; the
//! in-pool price used for quoting is kept in Q64.64 fixed point.

use fixed::types::U64F64;
use rust_decimal::prelude::*;

use crate::constants::{BASIS_POINT_MAX, BIN_ARRAY_SIZE, MAX_BIN_ID, MAX_BIN_STEP, MAX_DECIMALS, MIN_BIN_ID};
use crate::errors::{CoreError, CoreResult};

/// Reject decimal counts outside `[0, 18]`.
pub fn validate_decimals(decimals: u8) -> CoreResult<()> {
    if decimals > MAX_DECIMALS {
        return Err(CoreError::InvalidDecimals(decimals));
    }
    Ok(())
}

/// Reject a zero bin step or one wider than the program allows.
pub fn validate_bin_step(bin_step: u16) -> CoreResult<()> {
    if bin_step == 0 || bin_step > MAX_BIN_STEP {
        return Err(CoreError::InvalidBinStep(bin_step));
    }
    Ok(())
}

/// Check that a bin id lies inside the program's range.
pub fn is_bin_valid(bin: i32) -> bool {
    (MIN_BIN_ID..=MAX_BIN_ID).contains(&bin)
}

/// Price multiplier between two adjacent bins.
fn per_bin_factor(bin_step: u16) -> f64 {
    1.0 + f64::from(bin_step) / f64::from(BASIS_POINT_MAX)
}

/// Convert a human price (units of token B per unit of token A) into the bin
/// whose lower edge is at or below it.
///
/// `adjusted = price * 10^(decimals_b - decimals_a)` moves the price into raw
/// units before taking `floor(ln(adjusted) / ln(1 + bin_step / 10000))`.
/// Prices below one raw unit yield negative bins.
pub fn bin_from_price(price: Decimal, decimals_a: u8, decimals_b: u8, bin_step: u16) -> CoreResult<i32> {
    if price <= Decimal::ZERO {
        return Err(CoreError::InvalidPrice);
    }
    validate_decimals(decimals_a)?;
    validate_decimals(decimals_b)?;
    validate_bin_step(bin_step)?;

    let price = price.to_f64().ok_or(CoreError::InvalidPrice)?;
    let exponent = i32::from(decimals_b) - i32::from(decimals_a);
    let adjusted = price * 10f64.powi(exponent);

    let bin = (adjusted.ln() / per_bin_factor(bin_step).ln()).floor();
    if !bin.is_finite() || bin < f64::from(MIN_BIN_ID) || bin > f64::from(MAX_BIN_ID) {
        return Err(CoreError::BinOutOfRange);
    }

    Ok(bin as i32)
}

/// Human price at the lower edge of `bin`: the inverse of [`bin_from_price`].
pub fn price_from_bin(bin: i32, decimals_a: u8, decimals_b: u8, bin_step: u16) -> CoreResult<Decimal> {
    validate_decimals(decimals_a)?;
    validate_decimals(decimals_b)?;
    validate_bin_step(bin_step)?;
    if !is_bin_valid(bin) {
        return Err(CoreError::BinOutOfRange);
    }

    let exponent = i32::from(decimals_a) - i32::from(decimals_b);
    let price = per_bin_factor(bin_step).powi(bin) * 10f64.powi(exponent);

    // prices below Decimal's 28 fractional digits would round to zero
    match Decimal::from_f64(price) {
        Some(price) if price > Decimal::ZERO => Ok(price),
        _ => Err(CoreError::BinOutOfRange),
    }
}

/// Raw Q64.64 price of `bin`: raw units of token Y per raw unit of token X.
///
/// Computed by exponentiation by squaring so that the quote engine never
/// routes reserves through floating point. Bins whose price does not fit in
/// 64 integer bits (or underflows to zero) are rejected.
pub fn bin_price_q64(bin: i32, bin_step: u16) -> CoreResult<U64F64> {
    validate_bin_step(bin_step)?;
    if !is_bin_valid(bin) {
        return Err(CoreError::BinOutOfRange);
    }

    let base = U64F64::ONE
        + U64F64::from_num(bin_step) / U64F64::from_num(BASIS_POINT_MAX);
    let magnitude = checked_pow(base, bin.unsigned_abs()).ok_or(CoreError::BinOutOfRange)?;

    let price = if bin >= 0 {
        magnitude
    } else {
        U64F64::ONE.checked_div(magnitude).ok_or(CoreError::BinOutOfRange)?
    };

    if price == U64F64::ZERO {
        return Err(CoreError::BinOutOfRange);
    }
    Ok(price)
}

fn checked_pow(base: U64F64, mut exp: u32) -> Option<U64F64> {
    let mut result = U64F64::ONE;
    let mut base = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

/// Index of the bin array containing `bin`. Floors toward negative infinity.
pub fn bin_array_index(bin: i32) -> i64 {
    i64::from(bin).div_euclid(i64::from(BIN_ARRAY_SIZE))
}

/// Inclusive bin id bounds covered by the bin array at `index`.
pub fn bin_array_bounds(index: i64) -> (i32, i32) {
    let lower = index * i64::from(BIN_ARRAY_SIZE);
    let upper = lower + i64::from(BIN_ARRAY_SIZE) - 1;
    (lower as i32, upper as i32)
}

/// Number of whole bins the active bin may move for a slippage tolerance.
pub fn max_active_bin_slippage(slippage_bps: u16, bin_step: u16) -> CoreResult<i32> {
    validate_bin_step(bin_step)?;
    if slippage_bps > BASIS_POINT_MAX {
        return Err(CoreError::InvalidSlippage(slippage_bps));
    }
    Ok(i32::from(slippage_bps.div_ceil(bin_step)))
}
