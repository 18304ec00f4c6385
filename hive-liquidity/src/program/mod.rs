//! Pool program interface
//!
//! Account layouts, PDA derivation and instruction encoding for the binned
//! liquidity program that hosts community pools.

pub mod accounts;
pub mod instructions;
pub mod pda;

pub use accounts::{BinArrayAccount, BinRecord, LbPairAccount, PositionAccount, ProgramAccount};
pub use instructions::{InstructionBuilder, PoolInstructionBuilder, StrategyParameters, StrategyType};
pub use pda::PdaBuilder;

use solana_sdk::{hash::hashv, pubkey::Pubkey};

/// Default pool program (mainnet)
pub const DEFAULT_PROGRAM_ID: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo";

pub const PROGRAM_ID: Pubkey = solana_sdk::pubkey!("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo");

/// Anchor-style discriminator: first 8 bytes of `sha256("<namespace>:<name>")`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let hash = hashv(&[namespace.as_bytes(), b":", name.as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.to_bytes()[..8]);
    out
}
