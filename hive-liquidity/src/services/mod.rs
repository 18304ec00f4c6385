//! Business logic services

pub mod balance;
pub mod liquidity;
pub mod pool_accessor;
pub mod propagation;
pub mod swap;
pub mod tx_builder;

pub use balance::{BalanceCheck, BalanceValidator};
pub use liquidity::LiquidityService;
pub use pool_accessor::{FeeSummary, PoolAccessor};
pub use propagation::{BackoffSchedule, PropagationWaiter, TokioClock};
pub use swap::SwapService;
pub use tx_builder::{PendingTransaction, TransactionBuilder};

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::core::{ClaimsVerifier, Clock, CommunityStore, LedgerPort, ServiceError, ServiceResult};

/// Immutable engine settings derived from `ServiceConfig`
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub program_id: Pubkey,
    pub spread_bins: u32,
    pub supported_bin_steps: Vec<u16>,
    pub default_decimals: u8,
    pub base_fee_bps: u16,
    pub max_bins_per_transaction: u32,
    pub max_claims_per_transaction: usize,
    pub swap_bin_arrays: usize,
    pub compute_unit_limit: u32,
    pub priority_fee_microlamports: u64,
    pub default_slippage_bps: u16,
    pub preflight_simulation: bool,
    pub schedule: BackoffSchedule,
    pub propagation_deadline: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &ServiceConfig) -> ServiceResult<Self> {
        let program_id = Pubkey::from_str(&config.ledger.program_id)
            .map_err(|e| ServiceError::Configuration(format!("invalid program id: {}", e)))?;
        let liquidity = &config.liquidity;
        Ok(Self {
            program_id,
            spread_bins: liquidity.spread_bins,
            supported_bin_steps: liquidity.supported_bin_steps.clone(),
            default_decimals: liquidity.default_decimals,
            base_fee_bps: liquidity.base_fee_bps,
            max_bins_per_transaction: liquidity.max_bins_per_transaction,
            max_claims_per_transaction: liquidity.max_claims_per_transaction,
            swap_bin_arrays: liquidity.swap_bin_arrays,
            compute_unit_limit: liquidity.compute_unit_limit,
            priority_fee_microlamports: liquidity.priority_fee_microlamports,
            default_slippage_bps: liquidity.default_slippage_bps,
            preflight_simulation: liquidity.preflight_simulation,
            schedule: config.propagation.schedule(),
            propagation_deadline: config.propagation.deadline(),
        })
    }
}

/// Collaborators shared by every request. Holds no mutable state.
#[derive(Clone)]
pub struct ServiceContext {
    pub ledger: Arc<dyn LedgerPort>,
    pub store: Arc<dyn CommunityStore>,
    pub verifier: Arc<dyn ClaimsVerifier>,
    pub clock: Arc<dyn Clock>,
    pub settings: Arc<EngineSettings>,
}

impl ServiceContext {
    pub fn new(
        ledger: Arc<dyn LedgerPort>,
        store: Arc<dyn CommunityStore>,
        verifier: Arc<dyn ClaimsVerifier>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            ledger,
            store,
            verifier,
            clock,
            settings: Arc::new(settings),
        }
    }

    pub fn accessor(&self) -> PoolAccessor {
        PoolAccessor::new(self.ledger.clone(), self.settings.program_id, self.settings.default_decimals)
    }

    pub fn balances(&self) -> BalanceValidator {
        BalanceValidator::new(self.ledger.clone())
    }

    pub fn waiter(&self) -> PropagationWaiter {
        PropagationWaiter::new(
            self.ledger.clone(),
            self.clock.clone(),
            self.settings.schedule.clone(),
            self.settings.propagation_deadline,
        )
    }

    pub fn tx_builder(&self) -> TransactionBuilder {
        TransactionBuilder::new(self.ledger.clone(), self.settings.clone())
    }

    pub fn liquidity(&self) -> LiquidityService {
        LiquidityService::new(self.clone())
    }

    pub fn swaps(&self) -> SwapService {
        SwapService::new(self.clone())
    }
}
