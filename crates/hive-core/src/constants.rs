//! # Protocol Constants

/// Denominator for all basis-point quantities.
pub const BASIS_POINT_MAX: u16 = 10_000;

/// Largest bin step accepted by the pool program (5%).
pub const MAX_BIN_STEP: u16 = 500;

/// Bin id bounds of the pool program.
pub const MIN_BIN_ID: i32 = -443_636;
pub const MAX_BIN_ID: i32 = 443_636;

/// Number of bins stored per bin-array account.
pub const BIN_ARRAY_SIZE: i32 = 70;

/// Largest decimal count a mint may declare.
pub const MAX_DECIMALS: u8 = 18;

/// Decimals of the native asset and of its wrapped mint.
pub const NATIVE_DECIMALS: u8 = 9;

/// Default number of bins placed on each side of the active bin.
pub const DEFAULT_SPREAD_BINS: u32 = 5;
