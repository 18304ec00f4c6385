//! # Liquidity-Strategy Selection
//!
//! Chooses where a new deposit is placed relative to the active bin. The
//! selection is a pure function of its inputs so that a retried request always
//! lands on the same range.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_BIN_ID, MIN_BIN_ID};
use crate::errors::{CoreError, CoreResult};
use crate::pair::PairSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    /// Single-sided deposit starting at bin 0 of a freshly created pool.
    OneSided,
    /// Only the first token, placed in bins above the active bin.
    OneSidedAbove,
    /// Only the second token, placed in bins below the active bin.
    OneSidedBelow,
    /// Both tokens, spread symmetrically around the active bin.
    Balanced,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::OneSided => "oneSided",
            StrategyKind::OneSidedAbove => "oneSidedAbove",
            StrategyKind::OneSidedBelow => "oneSidedBelow",
            StrategyKind::Balanced => "balanced",
        }
    }

    pub fn is_one_sided(&self) -> bool {
        !matches!(self, StrategyKind::Balanced)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bin range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinRange {
    pub min_bin: i32,
    pub max_bin: i32,
}

impl BinRange {
    pub fn width(&self) -> u32 {
        (self.max_bin - self.min_bin + 1) as u32
    }

    pub fn contains(&self, bin: i32) -> bool {
        (self.min_bin..=self.max_bin).contains(&bin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub kind: StrategyKind,
    pub range: BinRange,
    pub amount_first: u64,
    pub amount_second: u64,
    /// Set when a two-sided bootstrap deposit was reduced to its community side.
    pub collapsed: bool,
}

/// Select the placement for a deposit of `(amount_first, amount_second)`.
///
/// | active bin | amounts | result |
/// |---|---|---|
/// | 0 | both | `OneSided`, community side only, `[0, spread]` |
/// | 0 | one | `OneSided`, `[0, spread]` |
/// | != 0 | first only | `OneSidedAbove`, `[a+1, a+spread]` |
/// | != 0 | second only | `OneSidedBelow`, `[max(0, a-spread), a-1]` for `a > 0`, `[a-spread, a-1]` otherwise |
/// | != 0 | both | `Balanced`, `[a-spread, a+spread]` |
/// | any | none | `ZeroLiquidity` |
pub fn select_strategy(
    active_bin: i32,
    amount_first: u64,
    amount_second: u64,
    community_side: PairSide,
    spread: u32,
) -> CoreResult<Strategy> {
    if amount_first == 0 && amount_second == 0 {
        return Err(CoreError::ZeroLiquidity);
    }
    if spread == 0 {
        return Err(CoreError::InvalidSpread);
    }
    let spread = i32::try_from(spread).map_err(|_| CoreError::InvalidSpread)?;

    let strategy = if active_bin == 0 {
        let collapsed = amount_first > 0 && amount_second > 0;
        let (amount_first, amount_second) = if collapsed {
            match community_side {
                PairSide::First => (amount_first, 0),
                PairSide::Second => (0, amount_second),
            }
        } else {
            (amount_first, amount_second)
        };
        Strategy {
            kind: StrategyKind::OneSided,
            range: BinRange {
                min_bin: 0,
                max_bin: spread,
            },
            amount_first,
            amount_second,
            collapsed,
        }
    } else {
        let (kind, range) = match (amount_first > 0, amount_second > 0) {
            (true, false) => (
                StrategyKind::OneSidedAbove,
                BinRange {
                    min_bin: active_bin.checked_add(1).ok_or(CoreError::BinOutOfRange)?,
                    max_bin: active_bin.checked_add(spread).ok_or(CoreError::BinOutOfRange)?,
                },
            ),
            (false, true) => {
                let lowest = active_bin.checked_sub(spread).ok_or(CoreError::BinOutOfRange)?;
                let min_bin = if active_bin > 0 { lowest.max(0) } else { lowest };
                (
                    StrategyKind::OneSidedBelow,
                    BinRange {
                        min_bin,
                        max_bin: active_bin - 1,
                    },
                )
            }
            _ => (
                StrategyKind::Balanced,
                BinRange {
                    min_bin: active_bin.checked_sub(spread).ok_or(CoreError::BinOutOfRange)?,
                    max_bin: active_bin.checked_add(spread).ok_or(CoreError::BinOutOfRange)?,
                },
            ),
        };
        Strategy {
            kind,
            range,
            amount_first,
            amount_second,
            collapsed: false,
        }
    };

    if strategy.range.min_bin < MIN_BIN_ID || strategy.range.max_bin > MAX_BIN_ID {
        return Err(CoreError::BinOutOfRange);
    }
    Ok(strategy)
}
