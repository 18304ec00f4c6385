//! Core trait abstractions (ports to the ledger, the store and the clock)

use async_trait::async_trait;
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey, transaction::Transaction};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::error::{LedgerResult, ServiceResult};
use super::types::*;

/// Ledger port - the read side of the RPC endpoint
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Fetch an account; `None` when it does not exist
    async fn get_account(&self, address: &Pubkey) -> LedgerResult<Option<Account>>;

    /// Fetch several accounts in one round trip, preserving order
    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> LedgerResult<Vec<Option<Account>>>;

    /// Native balance in lamports
    async fn get_balance(&self, address: &Pubkey) -> LedgerResult<u64>;

    /// Recent blockhash for new transactions
    async fn get_latest_blockhash(&self) -> LedgerResult<Hash>;

    /// Accounts owned by `program` matching all `filters`
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> LedgerResult<Vec<(Pubkey, Account)>>;

    /// Simulate without signature verification
    async fn simulate_transaction(&self, transaction: &Transaction) -> LedgerResult<SimulationOutcome>;
}

/// Community store port
#[async_trait]
pub trait CommunityStore: Send + Sync {
    async fn get_community(&self, id: Uuid) -> ServiceResult<Option<Community>>;

    async fn find_community_by_pool(&self, pool: &Pubkey) -> ServiceResult<Option<Community>>;

    async fn find_communities_by_creator(&self, creator_id: Uuid) -> ServiceResult<Vec<Community>>;

    /// Remember the pool derived for a community
    async fn record_pool_address(&self, id: Uuid, pool: &Pubkey) -> ServiceResult<()>;
}

/// Resolves a bearer token into typed claims
#[async_trait]
pub trait ClaimsVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> ServiceResult<Option<Claims>>;
}

/// Time source for the propagation waiter
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}
