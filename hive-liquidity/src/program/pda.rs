//! PDA derivation for pool program accounts

use solana_sdk::pubkey::Pubkey;

use crate::core::PoolState;

pub mod seeds {
    pub const ORACLE: &[u8] = b"oracle";
    pub const BIN_ARRAY: &[u8] = b"bin_array";
    pub const EVENT_AUTHORITY: &[u8] = b"__event_authority";
}

/// Unified PDA builder for all pool program addresses
#[derive(Debug, Clone, Copy)]
pub struct PdaBuilder {
    pub program_id: Pubkey,
}

impl PdaBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    /// Pool for a canonical pair and bin step. Callers pass `token_x < token_y`.
    pub fn lb_pair(&self, token_x: &Pubkey, token_y: &Pubkey, bin_step: u16) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[token_x.as_ref(), token_y.as_ref(), &bin_step.to_le_bytes()],
            &self.program_id,
        )
    }

    pub fn reserve(&self, lb_pair: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[lb_pair.as_ref(), mint.as_ref()], &self.program_id)
    }

    pub fn oracle(&self, lb_pair: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::ORACLE, lb_pair.as_ref()], &self.program_id)
    }

    pub fn bin_array(&self, lb_pair: &Pubkey, index: i64) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::BIN_ARRAY, lb_pair.as_ref(), &index.to_le_bytes()],
            &self.program_id,
        )
    }

    pub fn event_authority(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::EVENT_AUTHORITY], &self.program_id)
    }

    /// Addresses of a pool that does not exist yet.
    pub fn new_pool(&self, token_x: Pubkey, token_y: Pubkey, bin_step: u16, active_bin: i32, base_fee_bps: u16) -> PoolState {
        let (address, _) = self.lb_pair(&token_x, &token_y, bin_step);
        PoolState {
            address,
            token_x,
            token_y,
            bin_step,
            active_bin,
            base_fee_bps,
            reserve_x: self.reserve(&address, &token_x).0,
            reserve_y: self.reserve(&address, &token_y).0,
            oracle: self.oracle(&address).0,
        }
    }

    /// Bin-array indexes covering `[lower_bin, upper_bin]`, ascending.
    pub fn bin_array_indexes(lower_bin: i32, upper_bin: i32) -> Vec<i64> {
        let lower = hive_core::math::bin_array_index(lower_bin);
        let upper = hive_core::math::bin_array_index(upper_bin);
        (lower..=upper).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pda_derivation_is_deterministic() {
        let pdas = PdaBuilder::new(Pubkey::new_unique());
        let x = Pubkey::new_unique();
        let y = Pubkey::new_unique();
        assert_eq!(pdas.lb_pair(&x, &y, 25), pdas.lb_pair(&x, &y, 25));
        assert_ne!(pdas.lb_pair(&x, &y, 25).0, pdas.lb_pair(&x, &y, 10).0);
        assert_ne!(pdas.bin_array(&x, -1).0, pdas.bin_array(&x, 0).0);
    }

    #[test]
    fn test_bin_array_indexes_span_range() {
        assert_eq!(PdaBuilder::bin_array_indexes(0, 5), vec![0]);
        assert_eq!(PdaBuilder::bin_array_indexes(-5, 5), vec![-1, 0]);
        assert_eq!(PdaBuilder::bin_array_indexes(3039, 3049), vec![43]);
        assert_eq!(PdaBuilder::bin_array_indexes(65, 75), vec![0, 1]);
    }
}
