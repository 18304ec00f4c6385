//! API request types
//!
//! Human amounts and prices accept JSON strings or numbers.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::core::{ServiceError, ServiceResult};
use crate::services::liquidity::{AddLiquidity, CreatePool, RemoveLiquidity};
use crate::services::swap::SwapRequest;

/// `Json` that reports malformed or invalid bodies as validation errors
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        Ok(ApiJson(value))
    }
}

pub fn parse_pubkey(field: &str, value: &str) -> ServiceResult<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| ServiceError::validation(format!("{} is not a valid address", field)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub community_id: Uuid,
    pub token_mint_address: String,
    pub sol_amount: Decimal,
    pub token_amount: Decimal,
    #[validate(range(max = 18))]
    pub token_decimals: u8,
    #[validate(range(min = 1, max = 500))]
    pub bin_step: u16,
    pub initial_price: Decimal,
    pub user_public_key: String,
}

impl CreatePoolRequest {
    pub fn into_command(self) -> ServiceResult<CreatePool> {
        Ok(CreatePool {
            community_id: self.community_id,
            token_mint: parse_pubkey("tokenMintAddress", &self.token_mint_address)?,
            sol_amount: self.sol_amount,
            token_amount: self.token_amount,
            token_decimals: self.token_decimals,
            bin_step: self.bin_step,
            initial_price: self.initial_price,
            user: parse_pubkey("userPublicKey", &self.user_public_key)?,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityRequest {
    pub community_id: Uuid,
    pub pool_address: String,
    pub token_x_amount: Decimal,
    pub token_y_amount: Decimal,
    pub user_public_key: String,
    #[validate(range(max = 10000))]
    pub slippage_bps: Option<u16>,
}

impl AddLiquidityRequest {
    pub fn into_command(self) -> ServiceResult<AddLiquidity> {
        Ok(AddLiquidity {
            community_id: self.community_id,
            pool_address: parse_pubkey("poolAddress", &self.pool_address)?,
            token_x_amount: self.token_x_amount,
            token_y_amount: self.token_y_amount,
            user: parse_pubkey("userPublicKey", &self.user_public_key)?,
            slippage_bps: self.slippage_bps,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityRequest {
    pub user_public_key: String,
    pub position_address: String,
    #[validate(range(min = 1, max = 10000))]
    pub bps: u16,
    #[serde(default)]
    pub should_claim_and_close: bool,
}

impl RemoveLiquidityRequest {
    pub fn into_command(self) -> ServiceResult<RemoveLiquidity> {
        Ok(RemoveLiquidity {
            user: parse_pubkey("userPublicKey", &self.user_public_key)?,
            position_address: parse_pubkey("positionAddress", &self.position_address)?,
            bps: self.bps,
            claim_and_close: self.should_claim_and_close,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClaimFeesRequest {
    pub user_public_key: String,
    pub community_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SwapBody {
    pub pool_id: String,
    pub user_public_key: String,
    pub in_token: String,
    pub in_amount: Decimal,
    /// Basis points
    #[validate(range(max = 10000))]
    pub slippage: u16,
}

impl SwapBody {
    pub fn request(&self) -> ServiceResult<SwapRequest> {
        Ok(SwapRequest {
            pool_address: parse_pubkey("poolId", &self.pool_id)?,
            in_mint: parse_pubkey("inToken", &self.in_token)?,
            in_amount: self.in_amount,
            slippage_bps: self.slippage,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBody {
    pub pool_id: String,
    pub in_token: String,
    pub in_amount: Decimal,
    #[validate(range(max = 10000))]
    pub slippage: u16,
}

impl QuoteBody {
    pub fn request(&self) -> ServiceResult<SwapRequest> {
        Ok(SwapRequest {
            pool_address: parse_pubkey("poolId", &self.pool_id)?,
            in_mint: parse_pubkey("inToken", &self.in_token)?,
            in_amount: self.in_amount,
            slippage_bps: self.slippage,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub user_public_key: String,
}
