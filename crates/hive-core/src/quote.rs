//! # Exact-Input Swap Quotes
//!
//! Walks the pool's bins from the active bin in the direction of the trade.
//! Each bin trades at its own fixed price until one side of its reserves is
//! exhausted, after which the walk moves on to the next bin.

use fixed::types::U64F64;
use serde::{Deserialize, Serialize};

use crate::constants::BASIS_POINT_MAX;
use crate::errors::{CoreError, CoreResult};
use crate::math::{apply_slippage_floor, bin_price_q64, fee_on_gross, gross_from_net, validate_fee};

/// Reserves of a single bin, in raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinLiquidity {
    pub bin_id: i32,
    pub amount_x: u64,
    pub amount_y: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteParams {
    pub active_bin: i32,
    pub bin_step: u16,
    pub base_fee_bps: u16,
    /// True when the input is token X and the output token Y.
    pub swap_for_y: bool,
    pub amount_in: u64,
    pub slippage_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub in_amount: u64,
    pub consumed_in_amount: u64,
    pub out_amount: u64,
    pub min_out_amount: u64,
    pub fee_amount: u64,
    pub price_impact: f64,
    pub bins_crossed: u32,
    pub end_bin: i32,
}

impl SwapQuote {
    /// True when the loaded bins could not absorb the whole input.
    pub fn is_partial(&self) -> bool {
        self.consumed_in_amount < self.in_amount
    }
}

/// Quote an exact-input swap against `bins`.
///
/// Bins on the wrong side of the active bin are ignored, as are bins with no
/// reserve of the output token. The fee is taken from the gross input of each
/// bin and rounded up.
pub fn quote_exact_in(params: QuoteParams, bins: &[BinLiquidity]) -> CoreResult<SwapQuote> {
    if params.amount_in == 0 {
        return Err(CoreError::InvalidAmount("input amount must be greater than zero".to_string()));
    }
    if params.slippage_bps > BASIS_POINT_MAX {
        return Err(CoreError::InvalidSlippage(params.slippage_bps));
    }
    validate_fee(params.base_fee_bps)?;

    let spot = bin_price_q64(params.active_bin, params.bin_step)?;

    let mut path: Vec<&BinLiquidity> = bins
        .iter()
        .filter(|bin| {
            if params.swap_for_y {
                bin.bin_id <= params.active_bin
            } else {
                bin.bin_id >= params.active_bin
            }
        })
        .collect();
    if params.swap_for_y {
        path.sort_by(|a, b| b.bin_id.cmp(&a.bin_id));
    } else {
        path.sort_by_key(|bin| bin.bin_id);
    }

    let mut remaining = params.amount_in;
    let mut out_total: u64 = 0;
    let mut fee_total: u64 = 0;
    let mut bins_crossed: u32 = 0;
    let mut end_bin = params.active_bin;

    for bin in path {
        if remaining == 0 {
            break;
        }
        let reserve_out = if params.swap_for_y { bin.amount_y } else { bin.amount_x };
        if reserve_out == 0 {
            continue;
        }
        let price = bin_price_q64(bin.bin_id, params.bin_step)?;

        let max_net_in = net_in_to_drain(reserve_out, price, params.swap_for_y);
        let gross_for_max = gross_from_net(max_net_in, params.base_fee_bps).unwrap_or(u64::MAX);

        let (gross, out) = if remaining >= gross_for_max {
            (gross_for_max, reserve_out)
        } else {
            let fee = fee_on_gross(remaining, params.base_fee_bps)?;
            let out = amount_out(remaining - fee, price, params.swap_for_y).min(reserve_out);
            (remaining, out)
        };

        fee_total = fee_total
            .checked_add(fee_on_gross(gross, params.base_fee_bps)?)
            .ok_or(CoreError::MathOverflow)?;
        out_total = out_total.checked_add(out).ok_or(CoreError::MathOverflow)?;
        remaining -= gross;
        bins_crossed += 1;
        end_bin = bin.bin_id;
    }

    let consumed_in_amount = params.amount_in - remaining;
    let net_in = consumed_in_amount.saturating_sub(fee_total);
    let price_impact = price_impact(out_total, net_in, spot, params.swap_for_y);

    Ok(SwapQuote {
        in_amount: params.amount_in,
        consumed_in_amount,
        out_amount: out_total,
        min_out_amount: apply_slippage_floor(out_total, params.slippage_bps)?,
        fee_amount: fee_total,
        price_impact,
        bins_crossed,
        end_bin,
    })
}

/// Net input that buys the entire `reserve_out` of a bin, rounded up.
fn net_in_to_drain(reserve_out: u64, price: U64F64, swap_for_y: bool) -> u64 {
    let reserve = U64F64::from_num(reserve_out);
    let needed = if swap_for_y {
        reserve.checked_div(price)
    } else {
        reserve.checked_mul(price)
    };
    match needed {
        Some(value) => {
            let whole = value.to_num::<u64>();
            if value.frac() == U64F64::ZERO {
                whole
            } else {
                whole.saturating_add(1)
            }
        }
        None => u64::MAX,
    }
}

/// Output bought by `net_in` at `price`, rounded down. Saturates on overflow;
/// callers cap the result at the bin reserve.
fn amount_out(net_in: u64, price: U64F64, swap_for_y: bool) -> u64 {
    let input = U64F64::from_num(net_in);
    let out = if swap_for_y {
        input.checked_mul(price)
    } else {
        input.checked_div(price)
    };
    out.map(|value| value.to_num::<u64>()).unwrap_or(u64::MAX)
}

/// `1 - out / (net_in * spot)` in the trade direction, clamped to `[0, 1]`.
fn price_impact(out: u64, net_in: u64, spot: U64F64, swap_for_y: bool) -> f64 {
    if net_in == 0 {
        return 0.0;
    }
    let spot = spot.to_num::<f64>();
    let spot = if swap_for_y { spot } else { 1.0 / spot };
    let ideal = net_in as f64 * spot;
    if ideal <= 0.0 || !ideal.is_finite() {
        return 0.0;
    }
    (1.0 - out as f64 / ideal).clamp(0.0, 1.0)
}
