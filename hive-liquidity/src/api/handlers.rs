//! API request handlers

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use tracing::info;

use super::auth::AuthClaims;
use super::requests::*;
use super::responses::*;
use super::ApiState;
use crate::core::ServiceResult;
use crate::services::FeeSummary;

/// Create a community pool with its first position
pub async fn create_pool(
    State(state): State<ApiState>,
    AuthClaims(claims): AuthClaims,
    ApiJson(body): ApiJson<CreatePoolRequest>,
) -> ServiceResult<Json<CreatePoolResponse>> {
    info!(community = %body.community_id, bin_step = body.bin_step, "Create pool request");
    let created = state.ctx.liquidity().create_pool(&claims, body.into_command()?).await?;
    Ok(Json(CreatePoolResponse::from_created(&created)?))
}

pub async fn add_liquidity(
    State(state): State<ApiState>,
    AuthClaims(claims): AuthClaims,
    ApiJson(body): ApiJson<AddLiquidityRequest>,
) -> ServiceResult<Json<AddLiquidityResponse>> {
    info!(community = %body.community_id, pool = %body.pool_address, "Add liquidity request");
    let outcome = state.ctx.liquidity().add_liquidity(&claims, body.into_command()?).await?;
    Ok(Json(AddLiquidityResponse::from_outcome(&outcome)?))
}

pub async fn remove_liquidity(
    State(state): State<ApiState>,
    AuthClaims(claims): AuthClaims,
    ApiJson(body): ApiJson<RemoveLiquidityRequest>,
) -> ServiceResult<Json<TransactionsResponse>> {
    info!(
        position = %body.position_address,
        bps = body.bps,
        close = body.should_claim_and_close,
        "Remove liquidity request"
    );
    let transactions = state
        .ctx
        .liquidity()
        .remove_liquidity(&claims, body.into_command()?)
        .await?;
    Ok(Json(TransactionsResponse::encode(&transactions)?))
}

pub async fn claim_fees(
    State(state): State<ApiState>,
    AuthClaims(claims): AuthClaims,
    ApiJson(body): ApiJson<ClaimFeesRequest>,
) -> ServiceResult<Json<TransactionsResponse>> {
    info!(wallet = %body.user_public_key, community = ?body.community_id, "Claim fees request");
    let user = parse_pubkey("userPublicKey", &body.user_public_key)?;
    let transactions = state
        .ctx
        .liquidity()
        .claim_fees(&claims, &user, body.community_id)
        .await?;
    Ok(Json(TransactionsResponse::encode(&transactions)?))
}

pub async fn swap(
    State(state): State<ApiState>,
    AuthClaims(claims): AuthClaims,
    ApiJson(body): ApiJson<SwapBody>,
) -> ServiceResult<Json<SwapResponse>> {
    info!(pool = %body.pool_id, in_token = %body.in_token, amount = %body.in_amount, "Swap request");
    let user = parse_pubkey("userPublicKey", &body.user_public_key)?;
    let (transaction, quoted) = state.ctx.swaps().swap(&claims, &user, &body.request()?).await?;
    Ok(Json(SwapResponse {
        transaction: transaction.encode()?,
        quote: quoted.summary,
    }))
}

pub async fn quote(
    State(state): State<ApiState>,
    AuthClaims(_claims): AuthClaims,
    ApiJson(body): ApiJson<QuoteBody>,
) -> ServiceResult<Json<QuoteResponse>> {
    info!(pool = %body.pool_id, in_token = %body.in_token, amount = %body.in_amount, "Quote request");
    let quoted = state.ctx.swaps().quote(&body.request()?).await?;
    Ok(Json(QuoteResponse { quote: quoted.summary }))
}

/// Positions and accrued fees of a community creator
pub async fn pool_summary(
    State(state): State<ApiState>,
    AuthClaims(claims): AuthClaims,
    Path(pool_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> ServiceResult<Json<FeeSummary>> {
    info!(pool = %pool_id, "Pool summary request");
    let pool = parse_pubkey("poolId", &pool_id)?;
    let user = parse_pubkey("userPublicKey", &query.user_public_key)?;
    let summary = state.ctx.liquidity().management_summary(&claims, &pool, &user).await?;
    Ok(Json(summary))
}
