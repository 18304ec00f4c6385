//! Liquidity operations: pool creation, deposits, withdrawals and fee claims

use hive_core::math::{bin_array_index, bin_from_price, max_active_bin_slippage, to_raw_amount};
use hive_core::{canonicalize, select_strategy, BinRange, Strategy, TokenSide, BASIS_POINT_MAX, NATIVE_DECIMALS};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};
use uuid::Uuid;

use super::balance::BalanceCheck;
use super::pool_accessor::FeeSummary;
use super::tx_builder::{Deposit, PendingTransaction};
use super::ServiceContext;
use crate::core::{Claims, Community, ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct CreatePool {
    pub community_id: Uuid,
    pub token_mint: Pubkey,
    pub sol_amount: Decimal,
    pub token_amount: Decimal,
    pub token_decimals: u8,
    pub bin_step: u16,
    /// SOL per community token
    pub initial_price: Decimal,
    pub user: Pubkey,
}

#[derive(Debug, Clone)]
pub struct CreatedPool {
    pub transaction: PendingTransaction,
    pub pool_address: Pubkey,
    pub position_address: Pubkey,
    pub active_bin: i32,
    pub strategy: Strategy,
}

#[derive(Debug, Clone)]
pub struct AddLiquidity {
    pub community_id: Uuid,
    pub pool_address: Pubkey,
    pub token_x_amount: Decimal,
    pub token_y_amount: Decimal,
    pub user: Pubkey,
    pub slippage_bps: Option<u16>,
}

#[derive(Debug, Clone)]
pub enum AddLiquidityOutcome {
    /// The wallet must create this holding account, then retry.
    HoldingAccountRequired {
        transaction: PendingTransaction,
        holding_account: Pubkey,
        mint: Pubkey,
    },
    Ready {
        transaction: PendingTransaction,
        position_address: Pubkey,
        active_bin: i32,
        strategy: Strategy,
    },
}

#[derive(Debug, Clone)]
pub struct RemoveLiquidity {
    pub user: Pubkey,
    pub position_address: Pubkey,
    pub bps: u16,
    pub claim_and_close: bool,
}

pub struct LiquidityService {
    ctx: ServiceContext,
}

impl LiquidityService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn community(&self, id: Uuid) -> ServiceResult<Community> {
        self.ctx
            .store
            .get_community(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("community {}", id)))
    }

    fn ensure_supported_step(&self, bin_step: u16) -> ServiceResult<()> {
        if !self.ctx.settings.supported_bin_steps.contains(&bin_step) {
            return Err(ServiceError::validation(format!("unsupported bin step {}", bin_step)));
        }
        Ok(())
    }

    fn active_bin_slippage(&self, slippage_bps: Option<u16>, bin_step: u16) -> ServiceResult<i32> {
        let slippage = slippage_bps.unwrap_or(self.ctx.settings.default_slippage_bps);
        Ok(max_active_bin_slippage(slippage, bin_step)?)
    }

    /// Initialize arrays covering the strategy range and the active bin.
    async fn missing_bin_arrays(&self, pool: &Pubkey, active_bin: i32, range: BinRange) -> ServiceResult<Vec<i64>> {
        let lower = bin_array_index(range.min_bin.min(active_bin));
        let upper = bin_array_index(range.max_bin.max(active_bin));
        let indexes: Vec<i64> = (lower..=upper).collect();
        self.ctx.accessor().missing_bin_arrays(pool, &indexes).await
    }

    pub async fn create_pool(&self, claims: &Claims, request: CreatePool) -> ServiceResult<CreatedPool> {
        claims.ensure_wallet(&request.user)?;
        let community = self.community(request.community_id).await?;
        community.ensure_creator(claims)?;
        if community.token_mint != request.token_mint {
            return Err(ServiceError::validation("token mint does not belong to this community"));
        }
        self.ensure_supported_step(request.bin_step)?;

        let native_mint = spl_token::native_mint::id();
        let pair = canonicalize(
            TokenSide::new(request.token_mint, request.token_decimals),
            TokenSide::new(native_mint, NATIVE_DECIMALS),
            request.initial_price,
        )?;
        let active_bin = bin_from_price(pair.price, pair.first.decimals, pair.second.decimals, request.bin_step)?;

        let token_raw = to_raw_amount(request.token_amount, request.token_decimals)?;
        let sol_raw = to_raw_amount(request.sol_amount, NATIVE_DECIMALS)?;
        let (amount_first, amount_second) = pair.split_amounts(token_raw, sol_raw);
        let strategy = select_strategy(
            active_bin,
            amount_first,
            amount_second,
            pair.community_side(),
            self.ctx.settings.spread_bins,
        )?;
        if strategy.collapsed {
            warn!(
                community = %request.community_id,
                "Bootstrap deposit collapsed to the community token side"
            );
        }

        let builder = self.ctx.tx_builder();
        let pool = builder.pdas().new_pool(
            pair.first.mint,
            pair.second.mint,
            request.bin_step,
            active_bin,
            self.ctx.settings.base_fee_bps,
        );
        // a recorded pool that never landed on the ledger may be recreated
        for candidate in [Some(pool.address), community.pool_address].into_iter().flatten() {
            if self.ctx.ledger.get_account(&candidate).await?.is_some() {
                return Err(ServiceError::validation(format!("pool {} already exists", candidate)));
            }
        }

        self.ctx
            .balances()
            .require_funded(
                &request.user,
                &[
                    (pool.token_x, strategy.amount_first),
                    (pool.token_y, strategy.amount_second),
                ],
            )
            .await?;

        let deposit = Deposit {
            owner: request.user,
            strategy,
            max_active_bin_slippage: self.active_bin_slippage(None, request.bin_step)?,
            missing_bin_arrays: self.missing_bin_arrays(&pool.address, active_bin, strategy.range).await?,
        };
        let (transaction, position_address) = builder.create_pool(&pool, &deposit).await?;
        self.ctx
            .store
            .record_pool_address(request.community_id, &pool.address)
            .await?;

        info!(
            community = %request.community_id,
            pool = %pool.address,
            active_bin,
            strategy = %strategy.kind,
            "Create-pool transaction ready"
        );
        Ok(CreatedPool {
            transaction,
            pool_address: pool.address,
            position_address,
            active_bin,
            strategy,
        })
    }

    pub async fn add_liquidity(&self, claims: &Claims, request: AddLiquidity) -> ServiceResult<AddLiquidityOutcome> {
        claims.ensure_wallet(&request.user)?;
        let community = self.community(request.community_id).await?;
        if community.pool_address.is_some_and(|pool| pool != request.pool_address) {
            return Err(ServiceError::validation("pool does not belong to this community"));
        }

        // a pool created moments ago may not be readable yet
        self.ctx.waiter().wait_for_account(&request.pool_address).await?;
        let accessor = self.ctx.accessor();
        let pool = accessor.load_pool(&request.pool_address).await?;
        let community_side = pool.side_of(&community.token_mint).ok_or_else(|| {
            ServiceError::validation("pool does not trade the community token")
        })?;

        let tokens = accessor.pool_tokens(&pool).await?;
        let amount_x = to_raw_amount(request.token_x_amount, tokens.x.decimals)?;
        let amount_y = to_raw_amount(request.token_y_amount, tokens.y.decimals)?;
        let strategy = select_strategy(
            pool.active_bin,
            amount_x,
            amount_y,
            community_side,
            self.ctx.settings.spread_bins,
        )?;
        if strategy.collapsed {
            warn!(pool = %pool.address, "Bootstrap deposit collapsed to the community token side");
        }

        let requirements = [
            (pool.token_x, strategy.amount_first),
            (pool.token_y, strategy.amount_second),
        ];
        let builder = self.ctx.tx_builder();
        if let BalanceCheck::HoldingAccountMissing { holding_account, mint } =
            self.ctx.balances().require_all(&request.user, &requirements).await?
        {
            info!(wallet = %request.user, mint = %mint, "Holding account required before deposit");
            let transaction = builder.create_holding_account(&request.user, &mint).await?;
            return Ok(AddLiquidityOutcome::HoldingAccountRequired {
                transaction,
                holding_account,
                mint,
            });
        }

        let deposit = Deposit {
            owner: request.user,
            strategy,
            max_active_bin_slippage: self.active_bin_slippage(request.slippage_bps, pool.bin_step)?,
            missing_bin_arrays: self.missing_bin_arrays(&pool.address, pool.active_bin, strategy.range).await?,
        };
        let (transaction, position_address) = builder.add_liquidity(&pool, &deposit).await?;
        info!(
            pool = %pool.address,
            active_bin = pool.active_bin,
            min_bin = strategy.range.min_bin,
            max_bin = strategy.range.max_bin,
            strategy = %strategy.kind,
            "Add-liquidity transaction ready"
        );
        Ok(AddLiquidityOutcome::Ready {
            transaction,
            position_address,
            active_bin: pool.active_bin,
            strategy,
        })
    }

    pub async fn remove_liquidity(&self, claims: &Claims, request: RemoveLiquidity) -> ServiceResult<Vec<PendingTransaction>> {
        claims.ensure_wallet(&request.user)?;
        if request.bps == 0 || request.bps > BASIS_POINT_MAX {
            return Err(ServiceError::validation(format!("bps must be in 1..={}", BASIS_POINT_MAX)));
        }
        if request.claim_and_close && request.bps != BASIS_POINT_MAX {
            return Err(ServiceError::validation("closing a position requires removing all of it"));
        }

        let accessor = self.ctx.accessor();
        let position = accessor.load_position(&request.position_address).await?;
        if position.owner != request.user {
            return Err(ServiceError::forbidden("position belongs to another wallet"));
        }
        let pool = accessor.load_pool(&position.pool).await?;

        let transactions = self
            .ctx
            .tx_builder()
            .remove_liquidity(&pool, &position, request.bps, request.claim_and_close)
            .await?;
        info!(
            position = %position.address,
            bps = request.bps,
            transactions = transactions.len(),
            "Remove-liquidity transactions ready"
        );
        Ok(transactions)
    }

    /// Claim fees on every position the creator holds in their community
    /// pools, or in one community's pool when `community_id` is given.
    pub async fn claim_fees(
        &self,
        claims: &Claims,
        user: &Pubkey,
        community_id: Option<Uuid>,
    ) -> ServiceResult<Vec<PendingTransaction>> {
        claims.ensure_wallet(user)?;
        let communities = match community_id {
            Some(id) => {
                let community = self.community(id).await?;
                community.ensure_creator(claims)?;
                vec![community]
            }
            None => {
                let communities = self.ctx.store.find_communities_by_creator(claims.subject).await?;
                if communities.is_empty() {
                    return Err(ServiceError::forbidden("only community creators may claim fees"));
                }
                communities
            }
        };

        let accessor = self.ctx.accessor();
        let builder = self.ctx.tx_builder();
        let mut transactions = Vec::new();
        for pool_address in communities.iter().filter_map(|community| community.pool_address) {
            let pool = accessor.load_pool(&pool_address).await?;
            let positions: Vec<_> = accessor
                .positions_by_owner(&pool.address, user)
                .await?
                .into_iter()
                .filter(|position| position.has_pending_fees())
                .collect();
            transactions.extend(builder.claim_fees(&pool, user, &positions).await?);
        }
        info!(wallet = %user, transactions = transactions.len(), "Claim-fee transactions ready");
        Ok(transactions)
    }

    pub async fn management_summary(&self, claims: &Claims, pool_address: &Pubkey, user: &Pubkey) -> ServiceResult<FeeSummary> {
        claims.ensure_wallet(user)?;
        let community = self
            .ctx
            .store
            .find_community_by_pool(pool_address)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("community for pool {}", pool_address)))?;
        community.ensure_creator(claims)?;

        let accessor = self.ctx.accessor();
        let pool = accessor.load_pool(pool_address).await?;
        accessor.fee_summary(&pool, user).await
    }
}
