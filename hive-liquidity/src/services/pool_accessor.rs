//! Pool and position reads
//!
//! Every call goes to the ledger; nothing is cached between requests.

use hive_core::math::{bin_array_index, to_ui_amount};
use hive_core::{BinLiquidity, TokenSide, NATIVE_DECIMALS};
use rust_decimal::Decimal;
use serde::Serialize;
use solana_program::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{AccountFilter, LedgerPort, PoolState, PoolTokens, PositionState, ServiceError, ServiceResult};
use crate::program::{BinArrayAccount, LbPairAccount, PdaBuilder, PositionAccount, ProgramAccount};

/// Fees owed to one position, in human units
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFees {
    pub address: String,
    pub lower_bin_id: i32,
    pub upper_bin_id: i32,
    pub fees_first: Decimal,
    pub fees_second: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeTotals {
    pub first: Decimal,
    pub second: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub positions: Vec<PositionFees>,
    pub total_fees: FeeTotals,
}

/// Bins around the active bin plus the bin arrays they came from, in walk
/// order.
#[derive(Debug, Clone, Default)]
pub struct LoadedBins {
    pub bin_arrays: Vec<Pubkey>,
    pub bins: Vec<BinLiquidity>,
}

pub struct PoolAccessor {
    ledger: Arc<dyn LedgerPort>,
    pdas: PdaBuilder,
    default_decimals: u8,
}

impl PoolAccessor {
    pub fn new(ledger: Arc<dyn LedgerPort>, program_id: Pubkey, default_decimals: u8) -> Self {
        Self {
            ledger,
            pdas: PdaBuilder::new(program_id),
            default_decimals,
        }
    }

    async fn load_program_account<T: ProgramAccount>(&self, address: &Pubkey, what: &str) -> ServiceResult<T> {
        let account = self
            .ledger
            .get_account(address)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{} {}", what, address)))?;
        if account.owner != self.pdas.program_id {
            return Err(ServiceError::not_found(format!("{} {} (wrong owner)", what, address)));
        }
        T::decode(&account.data)
    }

    pub async fn load_pool(&self, address: &Pubkey) -> ServiceResult<PoolState> {
        let pool: LbPairAccount = self.load_program_account(address, "pool").await?;
        let state = pool.into_state(*address)?;
        debug!(pool = %address, active_bin = state.active_bin, bin_step = state.bin_step, "Loaded pool");
        Ok(state)
    }

    pub async fn load_position(&self, address: &Pubkey) -> ServiceResult<PositionState> {
        let position: PositionAccount = self.load_program_account(address, "position").await?;
        position.into_state(*address)
    }

    pub async fn positions_by_owner(&self, pool: &Pubkey, owner: &Pubkey) -> ServiceResult<Vec<PositionState>> {
        let filters = [
            AccountFilter::Memcmp {
                offset: PositionAccount::LB_PAIR_OFFSET,
                bytes: pool.to_bytes().to_vec(),
            },
            AccountFilter::Memcmp {
                offset: PositionAccount::OWNER_OFFSET,
                bytes: owner.to_bytes().to_vec(),
            },
        ];
        let accounts = self.ledger.get_program_accounts(&self.pdas.program_id, &filters).await?;

        let mut positions = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            match PositionAccount::decode(&account.data) {
                Ok(position) => positions.push(position.into_state(address)?),
                Err(e) => debug!(account = %address, "Skipping non-position account: {}", e),
            }
        }
        positions.sort_by_key(|position| (position.lower_bin, position.address));
        Ok(positions)
    }

    /// Mint decimals, or the configured default when the mint cannot be read.
    pub async fn mint_decimals(&self, mint: &Pubkey) -> u8 {
        if *mint == spl_token::native_mint::id() {
            return NATIVE_DECIMALS;
        }
        match self.ledger.get_account(mint).await {
            Ok(Some(account)) => match spl_token::state::Mint::unpack(&account.data) {
                Ok(state) => state.decimals,
                Err(e) => {
                    warn!(mint = %mint, "Undecodable mint, assuming {} decimals: {}", self.default_decimals, e);
                    self.default_decimals
                }
            },
            Ok(None) => {
                warn!(mint = %mint, "Mint not found, assuming {} decimals", self.default_decimals);
                self.default_decimals
            }
            Err(e) => {
                warn!(mint = %mint, "Mint read failed, assuming {} decimals: {}", self.default_decimals, e);
                self.default_decimals
            }
        }
    }

    /// Mint decimals for amount scaling. Unlike [`Self::mint_decimals`] this
    /// never guesses: a failed read is a transient RPC error and a missing or
    /// undecodable mint is reported to the caller.
    pub async fn mint_decimals_checked(&self, mint: &Pubkey) -> ServiceResult<u8> {
        if *mint == spl_token::native_mint::id() {
            return Ok(NATIVE_DECIMALS);
        }
        let account = self
            .ledger
            .get_account(mint)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("mint {}", mint)))?;
        spl_token::state::Mint::unpack(&account.data)
            .map(|state| state.decimals)
            .map_err(|e| ServiceError::validation(format!("{} is not a token mint: {}", mint, e)))
    }

    pub async fn pool_tokens(&self, pool: &PoolState) -> ServiceResult<PoolTokens> {
        Ok(PoolTokens {
            x: TokenSide::new(pool.token_x, self.mint_decimals_checked(&pool.token_x).await?),
            y: TokenSide::new(pool.token_y, self.mint_decimals_checked(&pool.token_y).await?),
        })
    }

    async fn display_tokens(&self, pool: &PoolState) -> PoolTokens {
        PoolTokens {
            x: TokenSide::new(pool.token_x, self.mint_decimals(&pool.token_x).await),
            y: TokenSide::new(pool.token_y, self.mint_decimals(&pool.token_y).await),
        }
    }

    pub async fn fee_summary(&self, pool: &PoolState, owner: &Pubkey) -> ServiceResult<FeeSummary> {
        let tokens = self.display_tokens(pool).await;
        let positions = self.positions_by_owner(&pool.address, owner).await?;

        let mut total_first = 0u64;
        let mut total_second = 0u64;
        let mut rows = Vec::with_capacity(positions.len());
        for position in &positions {
            total_first = total_first.saturating_add(position.fee_x_pending);
            total_second = total_second.saturating_add(position.fee_y_pending);
            rows.push(PositionFees {
                address: position.address.to_string(),
                lower_bin_id: position.lower_bin,
                upper_bin_id: position.upper_bin,
                fees_first: to_ui_amount(position.fee_x_pending, tokens.x.decimals)?,
                fees_second: to_ui_amount(position.fee_y_pending, tokens.y.decimals)?,
            });
        }

        Ok(FeeSummary {
            positions: rows,
            total_fees: FeeTotals {
                first: to_ui_amount(total_first, tokens.x.decimals)?,
                second: to_ui_amount(total_second, tokens.y.decimals)?,
            },
        })
    }

    /// Bin arrays among `indexes` that do not exist yet.
    pub async fn missing_bin_arrays(&self, pool: &Pubkey, indexes: &[i64]) -> ServiceResult<Vec<i64>> {
        let addresses: Vec<Pubkey> = indexes.iter().map(|index| self.pdas.bin_array(pool, *index).0).collect();
        let accounts = self.ledger.get_multiple_accounts(&addresses).await?;
        Ok(indexes
            .iter()
            .zip(accounts)
            .filter(|(_, account)| account.is_none())
            .map(|(index, _)| *index)
            .collect())
    }

    /// Load the active bin array and `arrays - 1` neighbours in the swap
    /// direction. Bin arrays that were never initialized are skipped.
    pub async fn load_bins(&self, pool: &PoolState, swap_for_y: bool, arrays: usize) -> ServiceResult<LoadedBins> {
        let active = bin_array_index(pool.active_bin);
        let step: i64 = if swap_for_y { -1 } else { 1 };
        let indexes: Vec<i64> = (0..arrays.max(1) as i64).map(|offset| active + offset * step).collect();
        let addresses: Vec<Pubkey> = indexes
            .iter()
            .map(|index| self.pdas.bin_array(&pool.address, *index).0)
            .collect();
        let accounts = self.ledger.get_multiple_accounts(&addresses).await?;

        let mut loaded = LoadedBins::default();
        for (address, account) in addresses.into_iter().zip(accounts) {
            let Some(account) = account else {
                continue;
            };
            let array = BinArrayAccount::decode(&account.data)?;
            if array.lb_pair != pool.address {
                return Err(ServiceError::Internal(format!(
                    "bin array {} belongs to {}, not {}",
                    address, array.lb_pair, pool.address
                )));
            }
            loaded.bins.extend(array.liquidity());
            loaded.bin_arrays.push(address);
        }
        debug!(
            pool = %pool.address,
            arrays = loaded.bin_arrays.len(),
            bins = loaded.bins.len(),
            "Loaded bins"
        );
        Ok(loaded)
    }
}
