//! Hive Liquidity Service Library
//!
//! Builds unsigned transactions for creating community token pools, adding and
//! removing liquidity, claiming fees and swapping. Pool state is read fresh
//! from the ledger on every request; nothing is custodied server-side.

pub mod api;
pub mod config;
pub mod core;
pub mod program;
pub mod rpc_client;
pub mod services;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use core::{ServiceError, ServiceResult};
pub use services::ServiceContext;
