//! Bearer-token authentication

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use super::ApiState;
use crate::core::{Claims, ServiceError};

/// Claims of the authenticated caller, verified once per request
#[derive(Debug, Clone, Copy)]
pub struct AuthClaims(pub Claims);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<ApiState> for AuthClaims {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ServiceError::Unauthenticated)?;
        let claims = state
            .ctx
            .verifier
            .verify(token)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;
        debug!(subject = %claims.subject, "Authenticated request");
        Ok(AuthClaims(claims))
    }
}
