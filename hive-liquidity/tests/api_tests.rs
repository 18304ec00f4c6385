//! API integration tests

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use hive_liquidity::api::{create_router, ApiState};
use hive_liquidity::config::ApiConfig;
use hive_liquidity::core::Claims;
use hive_liquidity::testing::{fund, Harness, PoolFixture};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use tower::ServiceExt; // for `oneshot`

const TOKEN: &str = "session-token";

fn create_test_api(harness: &Harness) -> Router {
    create_router(ApiState::new(harness.ctx.clone()), &ApiConfig::default())
}

fn login(harness: &Harness, claims: Claims) {
    harness.store.add_session(TOKEN, claims);
}

fn post(uri: &str, body: Value, authorized: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if authorized {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let harness = Harness::new();
    let request = Request::builder().uri("/health").body(Body::empty())?;

    let (status, body) = send(create_test_api(&harness), request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "hive-liquidity");
    Ok(())
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() -> Result<()> {
    let harness = Harness::new();
    let body = json!({
        "poolId": Pubkey::new_unique().to_string(),
        "inToken": Pubkey::new_unique().to_string(),
        "inAmount": "1",
        "slippage": 100,
    });

    let (status, response) = send(create_test_api(&harness), post("/api/v1/swap/quote", body.clone(), false)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["code"], "UNAUTHENTICATED");

    // a token without a live session is just as anonymous
    let (status, _) = send(create_test_api(&harness), post("/api/v1/swap/quote", body, true)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_invisible_pool_is_gateway_timeout() -> Result<()> {
    let harness = Harness::new();
    let pool = Pubkey::new_unique();
    let (claims, community) = harness.creator(Pubkey::new_unique(), Some(pool));
    login(&harness, claims);

    let body = json!({
        "communityId": community.id,
        "poolAddress": pool.to_string(),
        "tokenXAmount": "1",
        "tokenYAmount": "1",
        "userPublicKey": claims.wallet.to_string(),
    });
    let (status, response) = send(create_test_api(&harness), post("/api/v1/liquidity/add", body, true)).await?;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response["code"], "PROPAGATION_TIMEOUT");
    assert_eq!(response["retryable"], true);
    assert_eq!(response["attempts"], 40);
    assert_eq!(response["account"], pool.to_string());
    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_is_bad_request() -> Result<()> {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let (claims, community) = harness.creator(token_mint, None);
    fund(&harness.ledger, &claims.wallet, &token_mint, 0);
    harness.ledger.set_balance(claims.wallet, 10_000_000_000);
    login(&harness, claims);

    let body = json!({
        "communityId": community.id,
        "tokenMintAddress": token_mint.to_string(),
        "solAmount": "2",
        "tokenAmount": "1000",
        "tokenDecimals": 6,
        "binStep": 25,
        "initialPrice": "0.05",
        "userPublicKey": claims.wallet.to_string(),
    });
    let (status, response) = send(create_test_api(&harness), post("/api/v1/pools", body, true)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "INSUFFICIENT_FUNDS");
    assert_eq!(response["mint"], token_mint.to_string());
    assert_eq!(response["available"], "0");
    assert_eq!(response["required"], "1000000000");
    Ok(())
}

#[tokio::test]
async fn test_add_liquidity_from_empty_holding_account_is_bad_request() -> Result<()> {
    let harness = Harness::new();
    let token_mint = Pubkey::new_unique();
    let fixture = PoolFixture::with_mints(token_mint, spl_token::native_mint::id(), 100).install(&harness.ledger);
    let (claims, community) = harness.creator(token_mint, Some(fixture.address()));
    fund(&harness.ledger, &claims.wallet, &token_mint, 0);
    harness.ledger.set_balance(claims.wallet, 10_000_000_000);
    login(&harness, claims);

    let (token_x, token_y) = if fixture.state().token_x == token_mint {
        ("10", "0")
    } else {
        ("0", "10")
    };
    let body = json!({
        "communityId": community.id,
        "poolAddress": fixture.address().to_string(),
        "tokenXAmount": token_x,
        "tokenYAmount": token_y,
        "userPublicKey": claims.wallet.to_string(),
    });
    let (status, response) = send(create_test_api(&harness), post("/api/v1/liquidity/add", body, true)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "INSUFFICIENT_FUNDS");
    assert_eq!(response["available"], "0");
    assert_eq!(response["required"], "10000000000");
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() -> Result<()> {
    let harness = Harness::new();
    let (claims, _) = harness.creator(Pubkey::new_unique(), None);
    login(&harness, claims);

    let body = json!({
        "userPublicKey": claims.wallet.to_string(),
        "positionAddress": Pubkey::new_unique().to_string(),
        "bps": 20_000,
    });
    let (status, response) = send(create_test_api(&harness), post("/api/v1/liquidity/remove", body, true)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "VALIDATION_ERROR");

    let body = json!({ "userPublicKey": 42 });
    let (status, _) = send(create_test_api(&harness), post("/api/v1/liquidity/remove", body, true)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_quote_endpoint_returns_summary() -> Result<()> {
    let harness = Harness::new();
    let fixture = PoolFixture::new(100).install(&harness.ledger);
    fixture.set_bin(&harness.ledger, 100, 0, 50_000_000_000);
    let (claims, _) = harness.creator(Pubkey::new_unique(), Some(fixture.address()));
    login(&harness, claims);

    let body = json!({
        "poolId": fixture.address().to_string(),
        "inToken": fixture.state().token_x.to_string(),
        "inAmount": 1,
        "slippage": 100,
    });
    let (status, response) = send(create_test_api(&harness), post("/api/v1/swap/quote", body, true)).await?;
    assert_eq!(status, StatusCode::OK);
    let quote = &response["quote"];
    assert_eq!(quote["inAmount"], "1");
    assert_eq!(quote["binsCrossed"], 1);
    assert_eq!(quote["endBinId"], 100);
    assert!(quote["outAmount"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_summary_requires_creator() -> Result<()> {
    let harness = Harness::new();
    let fixture = PoolFixture::new(100).install(&harness.ledger);
    let (creator, _) = harness.creator(Pubkey::new_unique(), Some(fixture.address()));
    fixture.add_position(&harness.ledger, creator.wallet, 95, 99, 1_000_000_000, 0);

    let outsider = Claims {
        subject: uuid::Uuid::new_v4(),
        wallet: Pubkey::new_unique(),
    };
    login(&harness, outsider);
    let uri = format!(
        "/api/v1/pools/{}/summary?userPublicKey={}",
        fixture.address(),
        outsider.wallet
    );
    let request = Request::builder()
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())?;
    let (status, _) = send(create_test_api(&harness), request).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    login(&harness, creator);
    let uri = format!(
        "/api/v1/pools/{}/summary?userPublicKey={}",
        fixture.address(),
        creator.wallet
    );
    let request = Request::builder()
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())?;
    let (status, body) = send(create_test_api(&harness), request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["positions"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["totalFees"]["first"], "1");
    Ok(())
}
