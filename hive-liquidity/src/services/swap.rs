//! Swap quoting and swap transaction building

use hive_core::math::{to_raw_amount, to_ui_amount};
use hive_core::{quote_exact_in, PairSide, QuoteParams, SwapQuote, BASIS_POINT_MAX};
use rust_decimal::Decimal;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use super::tx_builder::{PendingTransaction, SwapOrder};
use super::ServiceContext;
use crate::core::{Claims, PoolState, ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub pool_address: Pubkey,
    pub in_mint: Pubkey,
    pub in_amount: Decimal,
    pub slippage_bps: u16,
}

/// Quote amounts in human units
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub in_amount: Decimal,
    pub consumed_in_amount: Decimal,
    pub out_amount: Decimal,
    pub min_out_amount: Decimal,
    pub price_impact: f64,
    pub fee: Decimal,
    pub bins_crossed: u32,
    pub end_bin_id: i32,
}

#[derive(Debug, Clone)]
pub struct QuotedSwap {
    pub pool: PoolState,
    pub input_side: PairSide,
    pub quote: SwapQuote,
    pub summary: QuoteSummary,
    pub bin_arrays: Vec<Pubkey>,
}

pub struct SwapService {
    ctx: ServiceContext,
}

impl SwapService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn quote(&self, request: &SwapRequest) -> ServiceResult<QuotedSwap> {
        if request.slippage_bps > BASIS_POINT_MAX {
            return Err(ServiceError::validation(format!("slippage {} bps is above 100%", request.slippage_bps)));
        }
        let accessor = self.ctx.accessor();
        let pool = accessor.load_pool(&request.pool_address).await?;
        let input_side = pool
            .side_of(&request.in_mint)
            .ok_or_else(|| ServiceError::validation(format!("{} is not traded by this pool", request.in_mint)))?;
        let swap_for_y = input_side == PairSide::First;

        let in_decimals = accessor.mint_decimals_checked(&request.in_mint).await?;
        let out_decimals = accessor.mint_decimals_checked(&pool.mint_of(input_side.other())).await?;
        let amount_in = to_raw_amount(request.in_amount, in_decimals)?;

        let loaded = accessor
            .load_bins(&pool, swap_for_y, self.ctx.settings.swap_bin_arrays)
            .await?;
        let quote = quote_exact_in(
            QuoteParams {
                active_bin: pool.active_bin,
                bin_step: pool.bin_step,
                base_fee_bps: pool.base_fee_bps,
                swap_for_y,
                amount_in,
                slippage_bps: request.slippage_bps,
            },
            &loaded.bins,
        )?;
        if quote.out_amount == 0 {
            return Err(ServiceError::validation("pool has no liquidity for this swap"));
        }

        let summary = QuoteSummary {
            in_amount: to_ui_amount(quote.in_amount, in_decimals)?,
            consumed_in_amount: to_ui_amount(quote.consumed_in_amount, in_decimals)?,
            out_amount: to_ui_amount(quote.out_amount, out_decimals)?,
            min_out_amount: to_ui_amount(quote.min_out_amount, out_decimals)?,
            price_impact: quote.price_impact,
            fee: to_ui_amount(quote.fee_amount, in_decimals)?,
            bins_crossed: quote.bins_crossed,
            end_bin_id: quote.end_bin,
        };
        Ok(QuotedSwap {
            pool,
            input_side,
            quote,
            summary,
            bin_arrays: loaded.bin_arrays,
        })
    }

    pub async fn swap(
        &self,
        claims: &Claims,
        user: &Pubkey,
        request: &SwapRequest,
    ) -> ServiceResult<(PendingTransaction, QuotedSwap)> {
        claims.ensure_wallet(user)?;
        let quoted = self.quote(request).await?;
        let amount_in = quoted.quote.consumed_in_amount;
        if quoted.quote.is_partial() {
            warn!(
                pool = %quoted.pool.address,
                requested = quoted.quote.in_amount,
                consumed = amount_in,
                "Swap trimmed to the liquidity in loaded bins"
            );
        }

        self.ctx
            .balances()
            .require_funded(user, &[(request.in_mint, amount_in)])
            .await?;

        let transaction = self
            .ctx
            .tx_builder()
            .swap(
                &quoted.pool,
                &SwapOrder {
                    user: *user,
                    input_side: quoted.input_side,
                    amount_in,
                    min_amount_out: quoted.quote.min_out_amount,
                    bin_arrays: quoted.bin_arrays.clone(),
                },
            )
            .await?;
        info!(
            pool = %quoted.pool.address,
            amount_in,
            min_out = quoted.quote.min_out_amount,
            bins_crossed = quoted.quote.bins_crossed,
            "Swap transaction ready"
        );
        Ok((transaction, quoted))
    }
}
