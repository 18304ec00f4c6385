//! Centralized error types for the liquidity service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hive_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Main service error type. Every variant maps to exactly one HTTP status.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Missing or invalid session token")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account {account} not visible after {attempts} attempts")]
    PropagationTimeout { account: String, attempts: u32 },

    #[error("Insufficient funds for {mint}: available {available}, required {required}")]
    InsufficientFunds {
        mint: String,
        available: u64,
        required: u64,
    },

    #[error("Ledger unavailable: {0}")]
    TransientRpc(String),

    #[error("Transaction rejected by program: {message}")]
    Program { message: String, logs: Vec<String> },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Ledger transport errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for ledger calls
pub type LedgerResult<T> = Result<T, LedgerError>;

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Authorization(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::PropagationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::TransientRpc(_) | ServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Program { .. } | ServiceError::Configuration(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Authorization(_) => "AUTHORIZATION_ERROR",
            ServiceError::Unauthenticated => "UNAUTHENTICATED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::PropagationTimeout { .. } => "PROPAGATION_TIMEOUT",
            ServiceError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            ServiceError::TransientRpc(_) => "LEDGER_UNAVAILABLE",
            ServiceError::Program { .. } => "PROGRAM_ERROR",
            ServiceError::Store(_) => "STORE_UNAVAILABLE",
            ServiceError::Configuration(_) => "CONFIGURATION_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::PropagationTimeout { .. } | ServiceError::TransientRpc(_) | ServiceError::Store(_)
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        } else {
            warn!(code = self.code(), "{}", self);
        }

        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        match &self {
            ServiceError::PropagationTimeout { account, attempts } => {
                body["retryable"] = json!(true);
                body["account"] = json!(account);
                body["attempts"] = json!(attempts);
                body["message"] = json!(
                    "The new account is not visible on the ledger yet. Please retry the request in a minute."
                );
            }
            ServiceError::InsufficientFunds { mint, available, required } => {
                body["mint"] = json!(mint);
                body["available"] = json!(available.to_string());
                body["required"] = json!(required.to_string());
            }
            ServiceError::Program { logs, .. } => {
                body["logs"] = json!(logs);
            }
            ServiceError::TransientRpc(_) | ServiceError::Store(_) => {
                body["retryable"] = json!(true);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MathOverflow => ServiceError::Internal(err.to_string()),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Transport(_) | LedgerError::Rpc { .. } => ServiceError::TransientRpc(err.to_string()),
            LedgerError::Decode(_) => ServiceError::Internal(err.to_string()),
        }
    }
}

/// Helper to convert sqlx errors
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Store(err.to_string())
    }
}

/// Helper to convert serialization errors
impl From<bincode::Error> for ServiceError {
    fn from(err: bincode::Error) -> Self {
        ServiceError::Internal(format!("serialization failed: {}", err))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Decode(err.to_string())
    }
}
