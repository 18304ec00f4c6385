//! API response types

use hive_core::Strategy;
use serde::Serialize;

use crate::core::ServiceResult;
use crate::services::liquidity::{AddLiquidityOutcome, CreatedPool};
use crate::services::swap::QuoteSummary;
use crate::services::tx_builder::{encode_all, PendingTransaction};

/// Placement of a deposit. Raw amounts are strings to survive JSON numbers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityParams {
    pub active_bin_id: i32,
    pub min_bin_id: i32,
    pub max_bin_id: i32,
    pub strategy: String,
    pub amount_x: String,
    pub amount_y: String,
    pub collapsed: bool,
}

impl LiquidityParams {
    fn new(active_bin: i32, strategy: &Strategy) -> Self {
        Self {
            active_bin_id: active_bin,
            min_bin_id: strategy.range.min_bin,
            max_bin_id: strategy.range.max_bin,
            strategy: strategy.kind.to_string(),
            amount_x: strategy.amount_first.to_string(),
            amount_y: strategy.amount_second.to_string(),
            collapsed: strategy.collapsed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolResponse {
    pub create_pool_transaction: String,
    pub pool_address: String,
    pub position_address: String,
    pub liquidity_params: LiquidityParams,
}

impl CreatePoolResponse {
    pub fn from_created(created: &CreatedPool) -> ServiceResult<Self> {
        Ok(Self {
            create_pool_transaction: created.transaction.encode()?,
            pool_address: created.pool_address.to_string(),
            position_address: created.position_address.to_string(),
            liquidity_params: LiquidityParams::new(created.active_bin, &created.strategy),
        })
    }
}

pub const CREATE_HOLDING_ACCOUNT: &str = "CREATE_HOLDING_ACCOUNT";

/// The wallet must create a holding account, then repeat the request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingAccountRequired {
    pub action: &'static str,
    pub serialized_transaction: String,
    pub holding_account: String,
    pub mint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReady {
    pub serialized_transaction: String,
    pub position_address: String,
    pub active_bin_id: i32,
    pub min_bin_id: i32,
    pub max_bin_id: i32,
    pub strategy: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AddLiquidityResponse {
    HoldingAccountRequired(HoldingAccountRequired),
    Ready(DepositReady),
}

impl AddLiquidityResponse {
    pub fn from_outcome(outcome: &AddLiquidityOutcome) -> ServiceResult<Self> {
        Ok(match outcome {
            AddLiquidityOutcome::HoldingAccountRequired {
                transaction,
                holding_account,
                mint,
            } => AddLiquidityResponse::HoldingAccountRequired(HoldingAccountRequired {
                action: CREATE_HOLDING_ACCOUNT,
                serialized_transaction: transaction.encode()?,
                holding_account: holding_account.to_string(),
                mint: mint.to_string(),
            }),
            AddLiquidityOutcome::Ready {
                transaction,
                position_address,
                active_bin,
                strategy,
            } => AddLiquidityResponse::Ready(DepositReady {
                serialized_transaction: transaction.encode()?,
                position_address: position_address.to_string(),
                active_bin_id: *active_bin,
                min_bin_id: strategy.range.min_bin,
                max_bin_id: strategy.range.max_bin,
                strategy: strategy.kind.to_string(),
            }),
        })
    }
}

/// Ordered transactions; the wallet submits them in this order.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<String>,
}

impl TransactionsResponse {
    pub fn encode(transactions: &[PendingTransaction]) -> ServiceResult<Self> {
        Ok(Self {
            transactions: encode_all(transactions)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SwapResponse {
    pub transaction: String,
    pub quote: QuoteSummary,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: QuoteSummary,
}
