//! On-chain account layouts of the pool program
//!
//! Every account starts with an 8-byte discriminator followed by the
//! Anchor-serialized body.

use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use hive_core::{BinLiquidity, BIN_ARRAY_SIZE};
use solana_sdk::pubkey::Pubkey;

use super::discriminator;
use crate::core::{PoolState, PositionState, ServiceError, ServiceResult};

/// Size of the account discriminator prefix
pub const DISCRIMINATOR_LEN: usize = 8;

/// Typed view of a program account
pub trait ProgramAccount: AnchorSerialize + AnchorDeserialize + Sized {
    const NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        discriminator("account", Self::NAME)
    }

    fn decode(data: &[u8]) -> ServiceResult<Self> {
        if data.len() < DISCRIMINATOR_LEN || data[..DISCRIMINATOR_LEN] != Self::discriminator() {
            return Err(ServiceError::Internal(format!("account is not a {}", Self::NAME)));
        }
        let mut body = &data[DISCRIMINATOR_LEN..];
        Self::deserialize(&mut body)
            .map_err(|e| ServiceError::Internal(format!("failed to decode {}: {}", Self::NAME, e)))
    }

    fn encode(&self) -> ServiceResult<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        self.serialize(&mut data)
            .map_err(|e| ServiceError::Internal(format!("failed to encode {}: {}", Self::NAME, e)))?;
        Ok(data)
    }
}

/// Pool account
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct LbPairAccount {
    pub bump_seed: u8,
    pub bin_step: u16,
    pub active_id: i32,
    pub base_fee_bps: u16,
    pub token_x_mint: Pubkey,
    pub token_y_mint: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub oracle: Pubkey,
    pub creator: Pubkey,
}

impl ProgramAccount for LbPairAccount {
    const NAME: &'static str = "LbPair";
}

impl LbPairAccount {
    pub fn into_state(self, address: Pubkey) -> ServiceResult<PoolState> {
        if self.token_x_mint >= self.token_y_mint {
            return Err(ServiceError::Internal(format!(
                "pool {} tokens are not in canonical order",
                address
            )));
        }
        Ok(PoolState {
            address,
            token_x: self.token_x_mint,
            token_y: self.token_y_mint,
            bin_step: self.bin_step,
            active_bin: self.active_id,
            base_fee_bps: self.base_fee_bps,
            reserve_x: self.reserve_x,
            reserve_y: self.reserve_y,
            oracle: self.oracle,
        })
    }
}

/// Liquidity position account
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct PositionAccount {
    pub lb_pair: Pubkey,
    pub owner: Pubkey,
    pub lower_bin_id: i32,
    pub upper_bin_id: i32,
    pub fee_x_pending: u64,
    pub fee_y_pending: u64,
    pub last_updated_at: i64,
}

impl ProgramAccount for PositionAccount {
    const NAME: &'static str = "Position";
}

impl PositionAccount {
    /// Byte offset of `lb_pair`, for memcmp filters
    pub const LB_PAIR_OFFSET: usize = DISCRIMINATOR_LEN;
    /// Byte offset of `owner`, for memcmp filters
    pub const OWNER_OFFSET: usize = DISCRIMINATOR_LEN + 32;

    pub fn into_state(self, address: Pubkey) -> ServiceResult<PositionState> {
        PositionState::new(
            address,
            self.owner,
            self.lb_pair,
            self.lower_bin_id,
            self.upper_bin_id,
            self.fee_x_pending,
            self.fee_y_pending,
        )
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinRecord {
    pub amount_x: u64,
    pub amount_y: u64,
}

/// A chunk of `BIN_ARRAY_SIZE` consecutive bins
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct BinArrayAccount {
    pub index: i64,
    pub lb_pair: Pubkey,
    pub bins: Vec<BinRecord>,
}

impl ProgramAccount for BinArrayAccount {
    const NAME: &'static str = "BinArray";

    fn decode(data: &[u8]) -> ServiceResult<Self> {
        if data.len() < DISCRIMINATOR_LEN || data[..DISCRIMINATOR_LEN] != Self::discriminator() {
            return Err(ServiceError::Internal("account is not a BinArray".to_string()));
        }
        let mut body = &data[DISCRIMINATOR_LEN..];
        let array = Self::deserialize(&mut body)
            .map_err(|e| ServiceError::Internal(format!("failed to decode BinArray: {}", e)))?;
        if array.bins.len() != BIN_ARRAY_SIZE as usize {
            return Err(ServiceError::Internal(format!(
                "bin array {} holds {} bins",
                array.index,
                array.bins.len()
            )));
        }
        Ok(array)
    }
}

impl BinArrayAccount {
    pub fn empty(lb_pair: Pubkey, index: i64) -> Self {
        Self {
            index,
            lb_pair,
            bins: vec![BinRecord::default(); BIN_ARRAY_SIZE as usize],
        }
    }

    /// Bins with any liquidity, tagged with their bin id
    pub fn liquidity(&self) -> Vec<BinLiquidity> {
        let (lower, _) = hive_core::math::bin_array_bounds(self.index);
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, bin)| bin.amount_x > 0 || bin.amount_y > 0)
            .map(|(offset, bin)| BinLiquidity {
                bin_id: lower + offset as i32,
                amount_x: bin.amount_x,
                amount_y: bin.amount_y,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_filter_offsets() {
        let position = PositionAccount {
            lb_pair: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            lower_bin_id: -3,
            upper_bin_id: 7,
            fee_x_pending: 1,
            fee_y_pending: 2,
            last_updated_at: 0,
        };
        let data = position.encode().unwrap();
        let pair_at = PositionAccount::LB_PAIR_OFFSET;
        let owner_at = PositionAccount::OWNER_OFFSET;
        assert_eq!(&data[pair_at..pair_at + 32], position.lb_pair.as_ref());
        assert_eq!(&data[owner_at..owner_at + 32], position.owner.as_ref());
        assert_eq!(PositionAccount::decode(&data).unwrap(), position);
    }

    #[test]
    fn test_pool_body_is_plain_borsh() {
        let pool = LbPairAccount {
            bump_seed: 254,
            bin_step: 25,
            active_id: -12,
            base_fee_bps: 25,
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
            creator: Pubkey::new_unique(),
        };
        let data = pool.encode().unwrap();
        let mut body = Vec::new();
        borsh::BorshSerialize::serialize(&pool, &mut body).unwrap();
        assert_eq!(&data[..DISCRIMINATOR_LEN], &LbPairAccount::discriminator());
        assert_eq!(&data[DISCRIMINATOR_LEN..], body.as_slice());
        assert_eq!(LbPairAccount::decode(&data).unwrap(), pool);
    }

    #[test]
    fn test_decode_rejects_wrong_discriminator() {
        let array = BinArrayAccount::empty(Pubkey::new_unique(), 0);
        let data = array.encode().unwrap();
        assert!(PositionAccount::decode(&data).is_err());
        assert!(LbPairAccount::decode(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_bin_array_liquidity_ids() {
        let mut array = BinArrayAccount::empty(Pubkey::new_unique(), -1);
        array.bins[69] = BinRecord { amount_x: 5, amount_y: 0 };
        array.bins[0] = BinRecord { amount_x: 0, amount_y: 9 };
        let bins = array.liquidity();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].bin_id, -70);
        assert_eq!(bins[1].bin_id, -1);
    }

    #[test]
    fn test_pool_requires_canonical_order() {
        let (a, b) = hive_core::pair::sort_pair(Pubkey::new_unique(), Pubkey::new_unique()).unwrap();
        let pool = LbPairAccount {
            bump_seed: 255,
            bin_step: 25,
            active_id: 3044,
            base_fee_bps: 25,
            token_x_mint: b,
            token_y_mint: a,
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
            creator: Pubkey::new_unique(),
        };
        assert!(pool.clone().into_state(Pubkey::new_unique()).is_err());
        let fixed = LbPairAccount { token_x_mint: a, token_y_mint: b, ..pool };
        assert_eq!(fixed.into_state(Pubkey::new_unique()).unwrap().active_bin, 3044);
    }
}
