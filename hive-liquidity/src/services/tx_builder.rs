//! Transaction assembly and encoding
//!
//! Transactions are built unsigned for the wallet. The only signature added
//! server-side is that of an ephemeral position keypair, which is dropped as
//! soon as it has signed.

use base64::Engine;
use hive_core::{BinRange, PairSide, Strategy};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    packet::PACKET_DATA_SIZE,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::sync::Arc;
use tracing::{debug, info};

use super::EngineSettings;
use crate::core::{LedgerPort, PoolState, PositionState, ServiceError, ServiceResult};
use crate::program::instructions::{
    AddLiquidityByStrategyParams, RemoveLiquidityByRangeParams, SwapParams, UserTokenAccounts,
};
use crate::program::{PdaBuilder, PoolInstructionBuilder, StrategyParameters};

/// An unsigned transaction ready for the wallet
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub transaction: Transaction,
    pub fee_payer: Pubkey,
    pub recent_blockhash: Hash,
    /// Ephemeral co-signer that already signed, if any
    pub ephemeral_signer: Option<Pubkey>,
}

impl PendingTransaction {
    fn new(instructions: &[Instruction], fee_payer: Pubkey, recent_blockhash: Hash) -> Self {
        let mut transaction = Transaction::new_with_payer(instructions, Some(&fee_payer));
        transaction.message.recent_blockhash = recent_blockhash;
        Self {
            transaction,
            fee_payer,
            recent_blockhash,
            ephemeral_signer: None,
        }
    }

    fn co_sign(&mut self, keypair: &Keypair) -> ServiceResult<()> {
        self.transaction
            .try_partial_sign(&[keypair], self.recent_blockhash)
            .map_err(|e| ServiceError::Internal(format!("failed to co-sign transaction: {}", e)))?;
        self.ephemeral_signer = Some(keypair.pubkey());
        Ok(())
    }

    /// bincode wire format, base64-encoded
    pub fn encode(&self) -> ServiceResult<String> {
        let bytes = bincode::serialize(&self.transaction)?;
        if bytes.len() > PACKET_DATA_SIZE {
            return Err(ServiceError::Internal(format!(
                "transaction is {} bytes, over the {} byte limit",
                bytes.len(),
                PACKET_DATA_SIZE
            )));
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// Encode a batch, preserving order
pub fn encode_all(transactions: &[PendingTransaction]) -> ServiceResult<Vec<String>> {
    transactions.iter().map(PendingTransaction::encode).collect()
}

/// A liquidity deposit into an existing or about-to-exist pool
#[derive(Debug, Clone)]
pub struct Deposit {
    pub owner: Pubkey,
    pub strategy: Strategy,
    pub max_active_bin_slippage: i32,
    /// Bin arrays in the strategy range that must be initialized first
    pub missing_bin_arrays: Vec<i64>,
}

/// A swap that has already been quoted
#[derive(Debug, Clone)]
pub struct SwapOrder {
    pub user: Pubkey,
    pub input_side: PairSide,
    pub amount_in: u64,
    pub min_amount_out: u64,
    pub bin_arrays: Vec<Pubkey>,
}

pub struct TransactionBuilder {
    ledger: Arc<dyn LedgerPort>,
    settings: Arc<EngineSettings>,
    instructions: PoolInstructionBuilder,
}

impl TransactionBuilder {
    pub fn new(ledger: Arc<dyn LedgerPort>, settings: Arc<EngineSettings>) -> Self {
        let instructions = PoolInstructionBuilder::new(settings.program_id);
        Self {
            ledger,
            settings,
            instructions,
        }
    }

    pub fn pdas(&self) -> &PdaBuilder {
        self.instructions.pdas()
    }

    fn compute_budget(&self) -> Vec<Instruction> {
        vec![
            ComputeBudgetInstruction::set_compute_unit_limit(self.settings.compute_unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(self.settings.priority_fee_microlamports),
        ]
    }

    fn user_accounts(owner: &Pubkey, pool: &PoolState) -> UserTokenAccounts {
        UserTokenAccounts {
            owner: *owner,
            token_x: get_associated_token_address(owner, &pool.token_x),
            token_y: get_associated_token_address(owner, &pool.token_y),
        }
    }

    fn create_holding(owner: &Pubkey, mint: &Pubkey) -> Instruction {
        create_associated_token_account_idempotent(owner, owner, mint, &spl_token::id())
    }

    /// Move `lamports` into the owner's wrapped SOL account.
    fn wrap_sol(owner: &Pubkey, lamports: u64) -> ServiceResult<Vec<Instruction>> {
        let native_mint = spl_token::native_mint::id();
        let wrapped = get_associated_token_address(owner, &native_mint);
        let sync = spl_token::instruction::sync_native(&spl_token::id(), &wrapped)
            .map_err(|e| ServiceError::Internal(format!("sync_native: {}", e)))?;
        Ok(vec![
            Self::create_holding(owner, &native_mint),
            system_instruction::transfer(owner, &wrapped, lamports),
            sync,
        ])
    }

    /// Close the wrapped SOL account back into the wallet.
    fn unwrap_sol(owner: &Pubkey) -> ServiceResult<Instruction> {
        let wrapped = get_associated_token_address(owner, &spl_token::native_mint::id());
        spl_token::instruction::close_account(&spl_token::id(), &wrapped, owner, owner, &[])
            .map_err(|e| ServiceError::Internal(format!("close_account: {}", e)))
    }

    fn native_side(pool: &PoolState) -> Option<PairSide> {
        pool.side_of(&spl_token::native_mint::id())
    }

    fn deposit_instructions(
        &self,
        pool: &PoolState,
        deposit: &Deposit,
        position: &Pubkey,
    ) -> ServiceResult<Vec<Instruction>> {
        let owner = &deposit.owner;
        let strategy = &deposit.strategy;
        let mut instructions = Vec::new();

        let native = Self::native_side(pool);
        for side in [PairSide::First, PairSide::Second] {
            if Some(side) != native {
                instructions.push(Self::create_holding(owner, &pool.mint_of(side)));
            }
        }
        let wrap_lamports = match native {
            Some(PairSide::First) => strategy.amount_first,
            Some(PairSide::Second) => strategy.amount_second,
            None => 0,
        };
        if native.is_some() {
            // the wrapped account must exist even when no SOL is deposited
            if wrap_lamports > 0 {
                instructions.extend(Self::wrap_sol(owner, wrap_lamports)?);
            } else {
                instructions.push(Self::create_holding(owner, &spl_token::native_mint::id()));
            }
        }

        for index in &deposit.missing_bin_arrays {
            instructions.push(self.instructions.initialize_bin_array(owner, &pool.address, *index)?);
        }

        instructions.push(
            self.instructions
                .initialize_position(owner, position, &pool.address, strategy.range)?,
        );
        instructions.push(self.instructions.add_liquidity_by_strategy(
            position,
            pool,
            &Self::user_accounts(owner, pool),
            AddLiquidityByStrategyParams {
                amount_x: strategy.amount_first,
                amount_y: strategy.amount_second,
                active_id: pool.active_bin,
                max_active_bin_slippage: deposit.max_active_bin_slippage,
                strategy_parameters: StrategyParameters {
                    min_bin_id: strategy.range.min_bin,
                    max_bin_id: strategy.range.max_bin,
                    strategy_type: strategy.kind.into(),
                },
            },
        )?);

        if wrap_lamports > 0 {
            instructions.push(Self::unwrap_sol(owner)?);
        }
        Ok(instructions)
    }

    async fn recent_blockhash(&self) -> ServiceResult<Hash> {
        Ok(self.ledger.get_latest_blockhash().await?)
    }

    /// Finish a deposit transaction: fresh position keypair, co-signed.
    async fn signed_deposit(
        &self,
        mut instructions: Vec<Instruction>,
        payer: &Pubkey,
        position: Keypair,
    ) -> ServiceResult<PendingTransaction> {
        let mut all = self.compute_budget();
        all.append(&mut instructions);
        let mut pending = PendingTransaction::new(&all, *payer, self.recent_blockhash().await?);
        pending.co_sign(&position)?;
        drop(position);
        self.preflight(std::slice::from_ref(&pending)).await?;
        Ok(pending)
    }

    /// Initialize `pool`, its bin arrays and a first position holding the
    /// initial deposit. Returns the transaction and the position address.
    pub async fn create_pool(&self, pool: &PoolState, deposit: &Deposit) -> ServiceResult<(PendingTransaction, Pubkey)> {
        let position = Keypair::new();
        let position_address = position.pubkey();

        let mut instructions = vec![self.instructions.initialize_lb_pair(&deposit.owner, pool)?];
        instructions.extend(self.deposit_instructions(pool, deposit, &position_address)?);

        let pending = self.signed_deposit(instructions, &deposit.owner, position).await?;
        info!(pool = %pool.address, position = %position_address, "Built create-pool transaction");
        Ok((pending, position_address))
    }

    pub async fn add_liquidity(&self, pool: &PoolState, deposit: &Deposit) -> ServiceResult<(PendingTransaction, Pubkey)> {
        let position = Keypair::new();
        let position_address = position.pubkey();
        let instructions = self.deposit_instructions(pool, deposit, &position_address)?;

        let pending = self.signed_deposit(instructions, &deposit.owner, position).await?;
        info!(pool = %pool.address, position = %position_address, "Built add-liquidity transaction");
        Ok((pending, position_address))
    }

    /// First half of the two-phase flow: create the missing holding account.
    pub async fn create_holding_account(&self, wallet: &Pubkey, mint: &Pubkey) -> ServiceResult<PendingTransaction> {
        let mut instructions = self.compute_budget();
        instructions.push(Self::create_holding(wallet, mint));
        Ok(PendingTransaction::new(&instructions, *wallet, self.recent_blockhash().await?))
    }

    /// Removal batches of at most `max_bins_per_transaction` bins, in bin
    /// order, optionally followed by a claim-and-close transaction.
    pub async fn remove_liquidity(
        &self,
        pool: &PoolState,
        position: &PositionState,
        bps: u16,
        claim_and_close: bool,
    ) -> ServiceResult<Vec<PendingTransaction>> {
        let owner = &position.owner;
        let user = Self::user_accounts(owner, pool);
        let blockhash = self.recent_blockhash().await?;
        let native = Self::native_side(pool);

        let chunks = bin_chunks(
            BinRange {
                min_bin: position.lower_bin,
                max_bin: position.upper_bin,
            },
            self.settings.max_bins_per_transaction,
        );
        let mut batches = Vec::with_capacity(chunks.len() + 1);
        for chunk in chunks {
            let mut instructions = self.compute_budget();
            instructions.push(Self::create_holding(owner, &pool.token_x));
            instructions.push(Self::create_holding(owner, &pool.token_y));
            instructions.push(self.instructions.remove_liquidity_by_range(
                &position.address,
                pool,
                &user,
                RemoveLiquidityByRangeParams {
                    from_bin_id: chunk.min_bin,
                    to_bin_id: chunk.max_bin,
                    bps_to_remove: bps,
                },
            )?);
            batches.push(instructions);
        }

        if claim_and_close {
            let mut instructions = self.compute_budget();
            instructions.push(self.instructions.claim_fee(&position.address, pool, &user)?);
            instructions.push(self.instructions.close_position(&position.address, &pool.address, owner)?);
            batches.push(instructions);
        }
        if native.is_some() {
            if let Some(last) = batches.last_mut() {
                last.push(Self::unwrap_sol(owner)?);
            }
        }

        let transactions: Vec<PendingTransaction> = batches
            .iter()
            .map(|instructions| PendingTransaction::new(instructions, *owner, blockhash))
            .collect();
        self.preflight(&transactions).await?;
        debug!(position = %position.address, transactions = transactions.len(), "Built removal transactions");
        Ok(transactions)
    }

    /// Batches of at most `max_claims_per_transaction` claims.
    pub async fn claim_fees(
        &self,
        pool: &PoolState,
        owner: &Pubkey,
        positions: &[PositionState],
    ) -> ServiceResult<Vec<PendingTransaction>> {
        if positions.is_empty() {
            return Ok(Vec::new());
        }
        let user = Self::user_accounts(owner, pool);
        let blockhash = self.recent_blockhash().await?;
        let native = Self::native_side(pool);

        let mut transactions = Vec::new();
        for chunk in positions.chunks(self.settings.max_claims_per_transaction.max(1)) {
            let mut instructions = self.compute_budget();
            for side in [PairSide::First, PairSide::Second] {
                instructions.push(Self::create_holding(owner, &pool.mint_of(side)));
            }
            for position in chunk {
                instructions.push(self.instructions.claim_fee(&position.address, pool, &user)?);
            }
            if native.is_some() {
                instructions.push(Self::unwrap_sol(owner)?);
            }
            transactions.push(PendingTransaction::new(&instructions, *owner, blockhash));
        }
        self.preflight(&transactions).await?;
        Ok(transactions)
    }

    pub async fn swap(&self, pool: &PoolState, order: &SwapOrder) -> ServiceResult<PendingTransaction> {
        let user = &order.user;
        let input_mint = pool.mint_of(order.input_side);
        let output_mint = pool.mint_of(order.input_side.other());
        let native_mint = spl_token::native_mint::id();

        let mut instructions = self.compute_budget();
        instructions.push(Self::create_holding(user, &output_mint));
        if input_mint == native_mint {
            instructions.extend(Self::wrap_sol(user, order.amount_in)?);
        }
        instructions.push(self.instructions.swap(
            pool,
            user,
            &get_associated_token_address(user, &input_mint),
            &get_associated_token_address(user, &output_mint),
            &order.bin_arrays,
            SwapParams {
                amount_in: order.amount_in,
                min_amount_out: order.min_amount_out,
            },
        )?);
        if input_mint == native_mint || output_mint == native_mint {
            instructions.push(Self::unwrap_sol(user)?);
        }

        let pending = PendingTransaction::new(&instructions, *user, self.recent_blockhash().await?);
        self.preflight(std::slice::from_ref(&pending)).await?;
        Ok(pending)
    }

    /// Simulate the first transaction of a batch when enabled. Later ones
    /// depend on state the first creates.
    async fn preflight(&self, transactions: &[PendingTransaction]) -> ServiceResult<()> {
        if !self.settings.preflight_simulation {
            return Ok(());
        }
        let Some(first) = transactions.first() else {
            return Ok(());
        };
        let outcome = self.ledger.simulate_transaction(&first.transaction).await?;
        if let Some(err) = outcome.err {
            return Err(ServiceError::Program {
                message: err,
                logs: outcome.logs,
            });
        }
        debug!(units = ?outcome.units_consumed, "Preflight passed");
        Ok(())
    }
}

/// Split `range` into consecutive chunks of at most `max_bins` bins.
pub fn bin_chunks(range: BinRange, max_bins: u32) -> Vec<BinRange> {
    let size = i64::from(max_bins.max(1));
    let mut chunks = Vec::new();
    let mut start = i64::from(range.min_bin);
    let end = i64::from(range.max_bin);
    while start <= end {
        let stop = (start + size - 1).min(end);
        chunks.push(BinRange {
            min_bin: start as i32,
            max_bin: stop as i32,
        });
        start = stop + 1;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_chunks_cover_range_in_order() {
        let chunks = bin_chunks(BinRange { min_bin: -10, max_bin: 150 }, 70);
        assert_eq!(
            chunks,
            vec![
                BinRange { min_bin: -10, max_bin: 59 },
                BinRange { min_bin: 60, max_bin: 129 },
                BinRange { min_bin: 130, max_bin: 150 },
            ]
        );
        assert_eq!(bin_chunks(BinRange { min_bin: 5, max_bin: 5 }, 70).len(), 1);
    }

    #[test]
    fn test_encode_rejects_oversized_transaction() {
        let payer = Pubkey::new_unique();
        let instructions: Vec<Instruction> = (0..40)
            .map(|_| system_instruction::transfer(&payer, &Pubkey::new_unique(), 1))
            .collect();
        let pending = PendingTransaction::new(&instructions, payer, Hash::default());
        assert!(matches!(pending.encode(), Err(ServiceError::Internal(_))));
    }

    #[test]
    fn test_co_sign_fills_ephemeral_signature() {
        let payer = Pubkey::new_unique();
        let ephemeral = Keypair::new();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![
                solana_sdk::instruction::AccountMeta::new(payer, true),
                solana_sdk::instruction::AccountMeta::new(ephemeral.pubkey(), true),
            ],
        );
        let mut pending = PendingTransaction::new(&[ix], payer, Hash::new_unique());
        pending.co_sign(&ephemeral).unwrap();

        let signers = &pending.transaction.message.account_keys[..2];
        assert_eq!(signers[0], payer);
        assert_eq!(pending.transaction.signatures[0], solana_sdk::signature::Signature::default());
        assert_ne!(pending.transaction.signatures[1], solana_sdk::signature::Signature::default());
        assert_eq!(pending.ephemeral_signer, Some(ephemeral.pubkey()));
        assert!(pending.encode().is_ok());
    }
}
