//! HTTP API for building liquidity and swap transactions

mod auth;
mod handlers;
pub mod requests;
pub mod responses;
mod routes;

pub use auth::AuthClaims;
pub use routes::*;

use crate::config::ApiConfig;
use crate::services::ServiceContext;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Start the API server
pub async fn start_server(ctx: ServiceContext, config: &ApiConfig) -> Result<tokio::task::JoinHandle<()>> {
    let app = create_router(ApiState::new(ctx), config);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API server listening on {}", config.bind_address);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}

/// Create the API router
pub fn create_router(state: ApiState, config: &ApiConfig) -> Router {
    let api = Router::new()
        .merge(create_pool_routes())
        .merge(create_liquidity_routes())
        .merge(create_swap_routes());

    let app = Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
        );

    if config.enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Health check handler
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "service": "hive-liquidity"
    }))
}

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    pub ctx: ServiceContext,
}

impl ApiState {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }
}
