//! # Hive Core
//!
//! Pure math shared by the liquidity service and its tests. Nothing in this
//! crate performs I/O; every function is deterministic in its inputs.
//!
//! - `math::bin_math`: human price <-> bin id conversions and Q64.64 bin prices
//! - `math::amounts`: decimal scaling, slippage and fee arithmetic
//! - `pair`: canonical ordering of a community token and its quote token
//! - `strategy`: liquidity placement selection around the active bin
//! - `quote`: exact-input swap quotes walked across bins

pub mod constants;
pub mod errors;
pub mod math;
pub mod pair;
pub mod quote;
pub mod strategy;

pub use constants::*;
pub use errors::{CoreError, CoreResult};
pub use pair::{canonicalize, CanonicalPair, PairSide, TokenSide};
pub use quote::{quote_exact_in, BinLiquidity, QuoteParams, SwapQuote};
pub use strategy::{select_strategy, BinRange, Strategy, StrategyKind};
