//! # Token-Pair Canonicalization
//!
//! Pools order their two tokens by the byte order of the mint. Callers name a
//! community token and a quote token instead, so every request is first mapped
//! onto the canonical `(first, second)` order and only that order flows
//! further down.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};
use crate::math::validate_decimals;

/// A token and its mint decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSide<K> {
    pub mint: K,
    pub decimals: u8,
}

impl<K> TokenSide<K> {
    pub fn new(mint: K, decimals: u8) -> Self {
        Self { mint, decimals }
    }
}

/// Position of a token within a canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairSide {
    First,
    Second,
}

impl PairSide {
    pub fn other(self) -> Self {
        match self {
            PairSide::First => PairSide::Second,
            PairSide::Second => PairSide::First,
        }
    }
}

/// Two tokens in canonical order, with the human price expressed as units of
/// `second` per unit of `first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPair<K> {
    pub first: TokenSide<K>,
    pub second: TokenSide<K>,
    pub price: Decimal,
    pub community_is_first: bool,
}

impl<K: Copy> CanonicalPair<K> {
    pub fn community_side(&self) -> PairSide {
        if self.community_is_first {
            PairSide::First
        } else {
            PairSide::Second
        }
    }

    pub fn community(&self) -> TokenSide<K> {
        match self.community_side() {
            PairSide::First => self.first,
            PairSide::Second => self.second,
        }
    }

    pub fn quote(&self) -> TokenSide<K> {
        match self.community_side() {
            PairSide::First => self.second,
            PairSide::Second => self.first,
        }
    }

    /// Map caller-declared `(community, quote)` amounts onto `(first, second)`.
    pub fn split_amounts<T>(&self, community_amount: T, quote_amount: T) -> (T, T) {
        if self.community_is_first {
            (community_amount, quote_amount)
        } else {
            (quote_amount, community_amount)
        }
    }
}

/// Order `community` and `quote` canonically.
///
/// `price` is quote units per community unit. If the community token ends up
/// second the price is inverted so it always reads as second per first.
pub fn canonicalize<K: Ord + Copy>(
    community: TokenSide<K>,
    quote: TokenSide<K>,
    price: Decimal,
) -> CoreResult<CanonicalPair<K>> {
    if community.mint == quote.mint {
        return Err(CoreError::IdenticalMints);
    }
    if price <= Decimal::ZERO {
        return Err(CoreError::InvalidPrice);
    }
    validate_decimals(community.decimals)?;
    validate_decimals(quote.decimals)?;

    if community.mint < quote.mint {
        Ok(CanonicalPair {
            first: community,
            second: quote,
            price,
            community_is_first: true,
        })
    } else {
        let inverted = Decimal::ONE.checked_div(price).ok_or(CoreError::InvalidPrice)?;
        if inverted.is_zero() {
            return Err(CoreError::InvalidPrice);
        }
        Ok(CanonicalPair {
            first: quote,
            second: community,
            price: inverted,
            community_is_first: false,
        })
    }
}

/// Order two keys canonically without any price attached.
pub fn sort_pair<K: Ord + Copy>(a: K, b: K) -> CoreResult<(K, K)> {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => Ok((a, b)),
        std::cmp::Ordering::Greater => Ok((b, a)),
        std::cmp::Ordering::Equal => Err(CoreError::IdenticalMints),
    }
}
