//! Difficulty retargeting.
//!
//! Every `retarget_window` blocks the difficulty moves by the rounded base-2
//! logarithm of `target / actual` average block time, so a chain producing
//! blocks four times too fast gains two bits. The step is clamped to
//! `max_retarget_step` and the result to `[min_difficulty, max_difficulty]`.

use genesis_chain_core::Block;
use std::borrow::Borrow;

use crate::config::ChainConfig;

/// Retargeting inputs, lifted from [`ChainConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetargetParams {
    pub target_block_time_ms: u64,
    pub max_step: u32,
    pub min_difficulty: u32,
    pub max_difficulty: u32,
}

impl From<&ChainConfig> for RetargetParams {
    fn from(config: &ChainConfig) -> Self {
        Self {
            target_block_time_ms: config.target_block_time_ms,
            max_step: config.max_retarget_step,
            min_difficulty: config.min_difficulty,
            max_difficulty: config.max_difficulty,
        }
    }
}

/// New difficulty given the most recent window of blocks, oldest first.
///
/// The last block's difficulty is the starting point. Fewer than two
/// blocks leave it unchanged.
pub fn retarget_difficulty<B: Borrow<Block>>(recent: &[B], params: &RetargetParams) -> u32 {
    let (Some(first), Some(last)) = (recent.first(), recent.last()) else {
        return params.min_difficulty;
    };
    let (first, last): (&Block, &Block) = (first.borrow(), last.borrow());
    let current = last.difficulty;
    if recent.len() < 2 {
        return current.clamp(params.min_difficulty, params.max_difficulty);
    }

    let span = last.timestamp.saturating_sub(first.timestamp).max(0) as u64;
    let intervals = (recent.len() - 1) as u64;
    let actual = (span / intervals).max(1);
    let target = params.target_block_time_ms.max(1);

    let delta: i64 = if target >= actual {
        rounded_log2_ratio(target, actual, params.max_step) as i64
    } else {
        -(rounded_log2_ratio(actual, target, params.max_step) as i64)
    };

    let next = (current as i64 + delta)
        .clamp(params.min_difficulty as i64, params.max_difficulty as i64);
    next as u32
}

/// `round(log2(num / den))` for `num >= den`, capped at `cap`.
///
/// Rounds up from `k` to `k + 1` once `num / den >= 2^(k + 1/2)`, compared
/// in integers as `num^2 >= den^2 * 2^(2k + 1)`.
fn rounded_log2_ratio(num: u64, den: u64, cap: u32) -> u32 {
    let num_sq = (num as u128) * (num as u128);
    let den_sq = (den as u128) * (den as u128);
    let mut k = 0u32;
    while k < cap {
        let threshold = 1u32
            .checked_add(2 * k)
            .and_then(|shift| 1u128.checked_shl(shift))
            .and_then(|pow| den_sq.checked_mul(pow));
        match threshold {
            Some(t) if num_sq >= t => k += 1,
            _ => break,
        }
    }
    k
}

/// Difficulty required of the block at `index`, given the chain up to and
/// including its parent (`chain[index - 1]`).
///
/// Block 1 and every block before the first full window use
/// `initial_difficulty`. Retargets fall on heights that are multiples of
/// `retarget_window`, measured over the window ending at the parent.
/// Genesis never takes part in a window. A window below 2 (rejected by
/// [`ChainConfig::validate`]) never changes the difficulty.
pub fn expected_difficulty<B: Borrow<Block>>(
    chain: &[B],
    index: u64,
    config: &ChainConfig,
) -> u32 {
    let window = config.retarget_window.max(1);
    let Some(parent) = index.checked_sub(1).and_then(|i| chain.get(i as usize)) else {
        return config.initial_difficulty;
    };
    let parent: &Block = parent.borrow();

    if parent.index == 0 {
        return config.initial_difficulty;
    }

    if index % window == 0 && index > window {
        let start = (index - window) as usize;
        let end = index as usize;
        return retarget_difficulty(&chain[start..end], &RetargetParams::from(config));
    }

    parent.difficulty
}
