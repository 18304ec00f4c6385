//! # Amount Arithmetic
//!
//! Scaling between human decimal amounts and raw integer amounts, plus the
//! basis-point helpers used by quoting and liquidity placement.

use rust_decimal::prelude::*;

use crate::constants::{BASIS_POINT_MAX, MAX_DECIMALS};
use crate::errors::{CoreError, CoreResult};

fn scale_factor(decimals: u8) -> CoreResult<Decimal> {
    if decimals > MAX_DECIMALS {
        return Err(CoreError::InvalidDecimals(decimals));
    }
    Ok(Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0))
}

/// Convert a human amount into raw units, truncating digits finer than the
/// mint's precision.
pub fn to_raw_amount(amount: Decimal, decimals: u8) -> CoreResult<u64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CoreError::InvalidAmount(format!("negative amount {}", amount)));
    }
    let scaled = amount
        .checked_mul(scale_factor(decimals)?)
        .ok_or(CoreError::AmountOverflow)?;
    scaled.trunc().to_u64().ok_or(CoreError::AmountOverflow)
}

/// Convert a raw amount back into a human amount.
pub fn to_ui_amount(raw: u64, decimals: u8) -> CoreResult<Decimal> {
    if decimals > MAX_DECIMALS {
        return Err(CoreError::InvalidDecimals(decimals));
    }
    Ok(Decimal::from_i128_with_scale(i128::from(raw), u32::from(decimals)).normalize())
}

/// `amount * (10000 - slippage_bps) / 10000`, rounded down.
pub fn apply_slippage_floor(amount: u64, slippage_bps: u16) -> CoreResult<u64> {
    if slippage_bps > BASIS_POINT_MAX {
        return Err(CoreError::InvalidSlippage(slippage_bps));
    }
    let kept = u128::from(BASIS_POINT_MAX - slippage_bps);
    let floored = u128::from(amount) * kept / u128::from(BASIS_POINT_MAX);
    u64::try_from(floored).map_err(|_| CoreError::AmountOverflow)
}

/// Fee taken from a gross input, rounded up so the pool never under-collects.
pub fn fee_on_gross(gross: u64, fee_bps: u16) -> CoreResult<u64> {
    validate_fee(fee_bps)?;
    let fee = mul_div_ceil(u128::from(gross), u128::from(fee_bps), u128::from(BASIS_POINT_MAX))?;
    u64::try_from(fee).map_err(|_| CoreError::AmountOverflow)
}

/// Smallest gross input whose post-fee remainder covers `net`.
pub fn gross_from_net(net: u64, fee_bps: u16) -> CoreResult<u64> {
    validate_fee(fee_bps)?;
    let gross = mul_div_ceil(
        u128::from(net),
        u128::from(BASIS_POINT_MAX),
        u128::from(BASIS_POINT_MAX - fee_bps),
    )?;
    u64::try_from(gross).map_err(|_| CoreError::AmountOverflow)
}

pub(crate) fn validate_fee(fee_bps: u16) -> CoreResult<()> {
    if fee_bps >= BASIS_POINT_MAX {
        return Err(CoreError::InvalidFee(fee_bps));
    }
    Ok(())
}

pub(crate) fn mul_div_ceil(a: u128, b: u128, denominator: u128) -> CoreResult<u128> {
    if denominator == 0 {
        return Err(CoreError::MathOverflow);
    }
    let product = a.checked_mul(b).ok_or(CoreError::MathOverflow)?;
    Ok(product.div_ceil(denominator))
}
