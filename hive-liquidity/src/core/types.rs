//! Core domain types

use hive_core::{PairSide, TokenSide};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};

/// Authenticated caller, resolved once from the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub subject: Uuid,
    pub wallet: Pubkey,
}

impl Claims {
    /// Reject requests that name a wallet other than the session's.
    pub fn ensure_wallet(&self, wallet: &Pubkey) -> ServiceResult<()> {
        if &self.wallet != wallet {
            return Err(ServiceError::forbidden("wallet does not match the authenticated session"));
        }
        Ok(())
    }
}

/// Community record as kept by the relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub token_mint: Pubkey,
    pub pool_address: Option<Pubkey>,
}

impl Community {
    pub fn ensure_creator(&self, claims: &Claims) -> ServiceResult<()> {
        if self.creator_id != claims.subject {
            return Err(ServiceError::forbidden("only the community creator may do this"));
        }
        Ok(())
    }
}

/// Decoded pool state. `token_x < token_y` by byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub address: Pubkey,
    pub token_x: Pubkey,
    pub token_y: Pubkey,
    pub bin_step: u16,
    pub active_bin: i32,
    pub base_fee_bps: u16,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub oracle: Pubkey,
}

impl PoolState {
    /// Which side of the pool `mint` is on.
    pub fn side_of(&self, mint: &Pubkey) -> Option<PairSide> {
        if mint == &self.token_x {
            Some(PairSide::First)
        } else if mint == &self.token_y {
            Some(PairSide::Second)
        } else {
            None
        }
    }

    pub fn mint_of(&self, side: PairSide) -> Pubkey {
        match side {
            PairSide::First => self.token_x,
            PairSide::Second => self.token_y,
        }
    }

    pub fn reserve_of(&self, side: PairSide) -> Pubkey {
        match side {
            PairSide::First => self.reserve_x,
            PairSide::Second => self.reserve_y,
        }
    }
}

/// Pool tokens with their decimals, in pool order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTokens {
    pub x: TokenSide<Pubkey>,
    pub y: TokenSide<Pubkey>,
}

/// Decoded liquidity position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub pool: Pubkey,
    pub lower_bin: i32,
    pub upper_bin: i32,
    pub fee_x_pending: u64,
    pub fee_y_pending: u64,
}

impl PositionState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: Pubkey,
        owner: Pubkey,
        pool: Pubkey,
        lower_bin: i32,
        upper_bin: i32,
        fee_x_pending: u64,
        fee_y_pending: u64,
    ) -> ServiceResult<Self> {
        if lower_bin > upper_bin {
            return Err(ServiceError::Internal(format!(
                "position {} has inverted range [{}, {}]",
                address, lower_bin, upper_bin
            )));
        }
        Ok(Self {
            address,
            owner,
            pool,
            lower_bin,
            upper_bin,
            fee_x_pending,
            fee_y_pending,
        })
    }

    pub fn has_pending_fees(&self) -> bool {
        self.fee_x_pending > 0 || self.fee_y_pending > 0
    }
}

/// `getProgramAccounts` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    Memcmp { offset: usize, bytes: Vec<u8> },
    DataSize(u64),
}

/// Result of a preflight simulation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub err: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_rejects_inverted_range() {
        let key = Pubkey::new_unique();
        assert!(PositionState::new(key, key, key, 5, 4, 0, 0).is_err());
        assert!(PositionState::new(key, key, key, 4, 4, 0, 0).is_ok());
    }

    #[test]
    fn test_wallet_mismatch_is_forbidden() {
        let claims = Claims { subject: Uuid::new_v4(), wallet: Pubkey::new_unique() };
        assert!(claims.ensure_wallet(&claims.wallet).is_ok());
        assert!(matches!(
            claims.ensure_wallet(&Pubkey::new_unique()),
            Err(ServiceError::Authorization(_))
        ));
    }
}
