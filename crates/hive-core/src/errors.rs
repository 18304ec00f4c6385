//! # Core Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Price must be greater than zero")]
    InvalidPrice,

    #[error("Decimals {0} out of range (0-18)")]
    InvalidDecimals(u8),

    #[error("Unsupported bin step {0}")]
    InvalidBinStep(u16),

    #[error("Bin id out of supported range")]
    BinOutOfRange,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Both liquidity amounts are zero")]
    ZeroLiquidity,

    #[error("Slippage of {0} bps exceeds 10000")]
    InvalidSlippage(u16),

    #[error("Fee of {0} bps is not below 10000")]
    InvalidFee(u16),

    #[error("Spread must be at least one bin")]
    InvalidSpread,

    #[error("Token pair must contain two distinct mints")]
    IdenticalMints,

    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Amount does not fit in 64 bits")]
    AmountOverflow,

    #[error("Math overflow")]
    MathOverflow,
}

pub type CoreResult<T> = Result<T, CoreError>;
