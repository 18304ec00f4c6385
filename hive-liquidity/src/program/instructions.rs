//! Instruction encoding for the pool program
//!
//! Instruction data is the 8-byte `global:<name>` discriminator followed by
//! the Anchor-serialized params struct.

use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use hive_core::{BinRange, StrategyKind};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use super::discriminator;
use super::pda::PdaBuilder;
use crate::core::{PoolState, ServiceError, ServiceResult};

/// Trait for instruction params with consistent encoding
pub trait InstructionBuilder: AnchorSerialize {
    /// Instruction name as declared by the program
    const NAME: &'static str;

    /// Build the instruction data (discriminator + serialized params)
    fn build_data(&self) -> ServiceResult<Vec<u8>> {
        let mut data = discriminator("global", Self::NAME).to_vec();
        self.serialize(&mut data)
            .map_err(|e| ServiceError::Internal(format!("failed to encode {}: {}", Self::NAME, e)))?;
        Ok(data)
    }
}

macro_rules! impl_instruction {
    ($params:ident, $name:literal) => {
        impl InstructionBuilder for $params {
            const NAME: &'static str = $name;
        }
    };
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitializeLbPairParams {
    pub active_id: i32,
    pub bin_step: u16,
    pub base_fee_bps: u16,
}

impl_instruction!(InitializeLbPairParams, "initialize_lb_pair");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitializeBinArrayParams {
    pub index: i64,
}

impl_instruction!(InitializeBinArrayParams, "initialize_bin_array");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitializePositionParams {
    pub lower_bin_id: i32,
    pub width: i32,
}

impl_instruction!(InitializePositionParams, "initialize_position");

/// Placement shape understood by the program
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyType {
    SpotOneSide,
    SpotBalanced,
}

impl From<StrategyKind> for StrategyType {
    fn from(kind: StrategyKind) -> Self {
        if kind.is_one_sided() {
            StrategyType::SpotOneSide
        } else {
            StrategyType::SpotBalanced
        }
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrategyParameters {
    pub min_bin_id: i32,
    pub max_bin_id: i32,
    pub strategy_type: StrategyType,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AddLiquidityByStrategyParams {
    pub amount_x: u64,
    pub amount_y: u64,
    pub active_id: i32,
    pub max_active_bin_slippage: i32,
    pub strategy_parameters: StrategyParameters,
}

impl_instruction!(AddLiquidityByStrategyParams, "add_liquidity_by_strategy");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RemoveLiquidityByRangeParams {
    pub from_bin_id: i32,
    pub to_bin_id: i32,
    pub bps_to_remove: u16,
}

impl_instruction!(RemoveLiquidityByRangeParams, "remove_liquidity_by_range");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClaimFeeParams {}

impl_instruction!(ClaimFeeParams, "claim_fee");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClosePositionParams {}

impl_instruction!(ClosePositionParams, "close_position");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SwapParams {
    pub amount_in: u64,
    pub min_amount_out: u64,
}

impl_instruction!(SwapParams, "swap");

/// Account-meta builder
#[derive(Default)]
struct AccountMetas {
    accounts: Vec<AccountMeta>,
}

impl AccountMetas {
    fn new() -> Self {
        Self::default()
    }

    fn signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, true));
        self
    }

    fn readonly_signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, true));
        self
    }

    fn writable(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, false));
        self
    }

    fn readonly(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, false));
        self
    }

    fn extend_writable(mut self, pubkeys: &[Pubkey]) -> Self {
        self.accounts
            .extend(pubkeys.iter().map(|key| AccountMeta::new(*key, false)));
        self
    }

    fn build(self, program_id: Pubkey, data: Vec<u8>) -> Instruction {
        Instruction {
            program_id,
            accounts: self.accounts,
            data,
        }
    }
}

/// Wallet-side token accounts of a liquidity instruction
#[derive(Debug, Clone, Copy)]
pub struct UserTokenAccounts {
    pub owner: Pubkey,
    pub token_x: Pubkey,
    pub token_y: Pubkey,
}

/// Builds pool program instructions
#[derive(Debug, Clone, Copy)]
pub struct PoolInstructionBuilder {
    pub program_id: Pubkey,
    pdas: PdaBuilder,
}

impl PoolInstructionBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            pdas: PdaBuilder::new(program_id),
        }
    }

    pub fn pdas(&self) -> &PdaBuilder {
        &self.pdas
    }

    fn event_authority(&self) -> Pubkey {
        self.pdas.event_authority().0
    }

    /// Lower and upper bin-array PDAs around `range`
    fn bin_array_pair(&self, pool: &Pubkey, range: BinRange) -> (Pubkey, Pubkey) {
        let lower = hive_core::math::bin_array_index(range.min_bin);
        let upper = hive_core::math::bin_array_index(range.max_bin);
        (self.pdas.bin_array(pool, lower).0, self.pdas.bin_array(pool, upper).0)
    }

    /// Initialize `pool`, whose addresses come from `PdaBuilder`.
    pub fn initialize_lb_pair(&self, funder: &Pubkey, pool: &PoolState) -> ServiceResult<Instruction> {
        let data = InitializeLbPairParams {
            active_id: pool.active_bin,
            bin_step: pool.bin_step,
            base_fee_bps: pool.base_fee_bps,
        }
        .build_data()?;
        Ok(AccountMetas::new()
            .signer(*funder)
            .writable(pool.address)
            .readonly(pool.token_x)
            .readonly(pool.token_y)
            .writable(pool.reserve_x)
            .writable(pool.reserve_y)
            .writable(pool.oracle)
            .readonly(spl_token::id())
            .readonly(system_program::id())
            .readonly(self.event_authority())
            .readonly(self.program_id)
            .build(self.program_id, data))
    }

    pub fn initialize_bin_array(&self, funder: &Pubkey, pool: &Pubkey, index: i64) -> ServiceResult<Instruction> {
        let data = InitializeBinArrayParams { index }.build_data()?;
        let (bin_array, _) = self.pdas.bin_array(pool, index);
        Ok(AccountMetas::new()
            .readonly(*pool)
            .writable(bin_array)
            .signer(*funder)
            .readonly(system_program::id())
            .build(self.program_id, data))
    }

    pub fn initialize_position(
        &self,
        payer: &Pubkey,
        position: &Pubkey,
        pool: &Pubkey,
        range: BinRange,
    ) -> ServiceResult<Instruction> {
        let width = i32::try_from(range.width())
            .map_err(|_| ServiceError::validation("position range is too wide"))?;
        let data = InitializePositionParams {
            lower_bin_id: range.min_bin,
            width,
        }
        .build_data()?;
        Ok(AccountMetas::new()
            .signer(*payer)
            .signer(*position)
            .readonly(*pool)
            .readonly_signer(*payer)
            .readonly(system_program::id())
            .readonly(self.event_authority())
            .readonly(self.program_id)
            .build(self.program_id, data))
    }

    fn liquidity_accounts(
        &self,
        position: &Pubkey,
        pool: &PoolState,
        user: &UserTokenAccounts,
        range: BinRange,
    ) -> AccountMetas {
        let (lower, upper) = self.bin_array_pair(&pool.address, range);
        AccountMetas::new()
            .writable(*position)
            .writable(pool.address)
            .writable(lower)
            .writable(upper)
            .writable(user.token_x)
            .writable(user.token_y)
            .writable(pool.reserve_x)
            .writable(pool.reserve_y)
            .readonly(pool.token_x)
            .readonly(pool.token_y)
            .readonly_signer(user.owner)
            .readonly(spl_token::id())
            .readonly(spl_token::id())
            .readonly(self.event_authority())
            .readonly(self.program_id)
    }

    pub fn add_liquidity_by_strategy(
        &self,
        position: &Pubkey,
        pool: &PoolState,
        user: &UserTokenAccounts,
        params: AddLiquidityByStrategyParams,
    ) -> ServiceResult<Instruction> {
        let range = BinRange {
            min_bin: params.strategy_parameters.min_bin_id,
            max_bin: params.strategy_parameters.max_bin_id,
        };
        let data = params.build_data()?;
        Ok(self
            .liquidity_accounts(position, pool, user, range)
            .build(self.program_id, data))
    }

    pub fn remove_liquidity_by_range(
        &self,
        position: &Pubkey,
        pool: &PoolState,
        user: &UserTokenAccounts,
        params: RemoveLiquidityByRangeParams,
    ) -> ServiceResult<Instruction> {
        let range = BinRange {
            min_bin: params.from_bin_id,
            max_bin: params.to_bin_id,
        };
        let data = params.build_data()?;
        Ok(self
            .liquidity_accounts(position, pool, user, range)
            .build(self.program_id, data))
    }

    pub fn claim_fee(&self, position: &Pubkey, pool: &PoolState, user: &UserTokenAccounts) -> ServiceResult<Instruction> {
        let data = ClaimFeeParams {}.build_data()?;
        Ok(AccountMetas::new()
            .writable(pool.address)
            .writable(*position)
            .readonly_signer(user.owner)
            .writable(pool.reserve_x)
            .writable(pool.reserve_y)
            .writable(user.token_x)
            .writable(user.token_y)
            .readonly(pool.token_x)
            .readonly(pool.token_y)
            .readonly(spl_token::id())
            .readonly(self.event_authority())
            .readonly(self.program_id)
            .build(self.program_id, data))
    }

    pub fn close_position(&self, position: &Pubkey, pool: &Pubkey, owner: &Pubkey) -> ServiceResult<Instruction> {
        let data = ClosePositionParams {}.build_data()?;
        Ok(AccountMetas::new()
            .writable(*position)
            .writable(*pool)
            .readonly_signer(*owner)
            .writable(*owner)
            .readonly(self.event_authority())
            .readonly(self.program_id)
            .build(self.program_id, data))
    }

    /// Swap `amount_in` of the token held in `user_token_in`. Bin arrays the
    /// walk may touch are passed as remaining accounts, in walk order.
    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        &self,
        pool: &PoolState,
        user: &Pubkey,
        user_token_in: &Pubkey,
        user_token_out: &Pubkey,
        bin_arrays: &[Pubkey],
        params: SwapParams,
    ) -> ServiceResult<Instruction> {
        let data = params.build_data()?;
        Ok(AccountMetas::new()
            .writable(pool.address)
            .writable(pool.reserve_x)
            .writable(pool.reserve_y)
            .writable(*user_token_in)
            .writable(*user_token_out)
            .readonly(pool.token_x)
            .readonly(pool.token_y)
            .writable(pool.oracle)
            .readonly(self.program_id) // no host fee account
            .readonly_signer(*user)
            .readonly(spl_token::id())
            .readonly(spl_token::id())
            .readonly(self.event_authority())
            .readonly(self.program_id)
            .extend_writable(bin_arrays)
            .build(self.program_id, data))
    }
}
