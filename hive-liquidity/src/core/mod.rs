//! Core domain abstractions and types
//!
//! The ports the services depend on, the service error taxonomy, and the
//! domain types shared between the services and the HTTP layer. Nothing here
//! talks to the network.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{LedgerError, LedgerResult, ServiceError, ServiceResult};
pub use traits::{ClaimsVerifier, Clock, CommunityStore, LedgerPort};
pub use types::{AccountFilter, Claims, Community, PoolState, PoolTokens, PositionState, SimulationOutcome};
