//! API route definitions

use super::{handlers::*, ApiState};
use axum::{
    routing::{get, post},
    Router,
};

/// Pool creation and management routes
pub fn create_pool_routes() -> Router<ApiState> {
    Router::new()
        .route("/pools", post(create_pool))
        .route("/pools/:pool_id/summary", get(pool_summary))
}

/// Deposit, withdrawal and fee routes
pub fn create_liquidity_routes() -> Router<ApiState> {
    Router::new()
        .route("/liquidity/add", post(add_liquidity))
        .route("/liquidity/remove", post(remove_liquidity))
        .route("/liquidity/claim-fees", post(claim_fees))
}

pub fn create_swap_routes() -> Router<ApiState> {
    Router::new()
        .route("/swap", post(swap))
        .route("/swap/quote", post(quote))
}
