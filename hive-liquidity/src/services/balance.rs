//! Wallet balance checks ahead of transaction building

use solana_program::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use tracing::debug;

use crate::core::{LedgerPort, ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCheck {
    Sufficient { available: u64 },
    /// The wallet has no associated token account for `mint` yet.
    HoldingAccountMissing { holding_account: Pubkey, mint: Pubkey },
}

pub struct BalanceValidator {
    ledger: Arc<dyn LedgerPort>,
}

impl BalanceValidator {
    pub fn new(ledger: Arc<dyn LedgerPort>) -> Self {
        Self { ledger }
    }

    /// Check that `wallet` holds at least `required` raw units of `mint`.
    ///
    /// The native mint is checked against the wallet's lamports, since the
    /// transaction wraps SOL on the fly.
    pub async fn check(&self, wallet: &Pubkey, mint: &Pubkey, required: u64) -> ServiceResult<BalanceCheck> {
        if *mint == spl_token::native_mint::id() {
            let available = self.ledger.get_balance(wallet).await?;
            return ensure_covers(mint, available, required);
        }

        let holding_account = get_associated_token_address(wallet, mint);
        let Some(account) = self.ledger.get_account(&holding_account).await? else {
            debug!(wallet = %wallet, mint = %mint, "No holding account");
            return Ok(BalanceCheck::HoldingAccountMissing {
                holding_account,
                mint: *mint,
            });
        };
        let token_account = spl_token::state::Account::unpack(&account.data).map_err(|e| {
            ServiceError::Internal(format!("holding account {} is not a token account: {}", holding_account, e))
        })?;
        ensure_covers(mint, token_account.amount, required)
    }

    /// Check every nonzero requirement. Stops at the first missing holding
    /// account and fails on the first shortfall.
    pub async fn require_all(&self, wallet: &Pubkey, requirements: &[(Pubkey, u64)]) -> ServiceResult<BalanceCheck> {
        let mut available = 0;
        for (mint, required) in requirements.iter().filter(|(_, required)| *required > 0) {
            match self.check(wallet, mint, *required).await? {
                BalanceCheck::Sufficient { available: amount } => available = amount,
                missing @ BalanceCheck::HoldingAccountMissing { .. } => return Ok(missing),
            }
        }
        Ok(BalanceCheck::Sufficient { available })
    }

    /// Like `require_all`, but a missing holding account counts as a zero
    /// balance.
    pub async fn require_funded(&self, wallet: &Pubkey, requirements: &[(Pubkey, u64)]) -> ServiceResult<()> {
        match self.require_all(wallet, requirements).await? {
            BalanceCheck::Sufficient { .. } => Ok(()),
            BalanceCheck::HoldingAccountMissing { mint, .. } => {
                let required = requirements
                    .iter()
                    .find(|(candidate, _)| *candidate == mint)
                    .map(|(_, required)| *required)
                    .unwrap_or_default();
                Err(ServiceError::InsufficientFunds {
                    mint: mint.to_string(),
                    available: 0,
                    required,
                })
            }
        }
    }
}

fn ensure_covers(mint: &Pubkey, available: u64, required: u64) -> ServiceResult<BalanceCheck> {
    if available < required {
        return Err(ServiceError::InsufficientFunds {
            mint: mint.to_string(),
            available,
            required,
        });
    }
    Ok(BalanceCheck::Sufficient { available })
}
