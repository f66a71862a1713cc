//! Chain parameters.

use genesis_chain_core::COIN;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Consensus parameters shared by every node on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Difficulty (leading zero bits) of block 1 and of every block until
    /// the first retarget.
    pub initial_difficulty: u32,

    /// Desired average spacing between blocks (milliseconds).
    pub target_block_time_ms: u64,

    /// Difficulty is recomputed every `retarget_window` blocks. Must be at
    /// least 2.
    pub retarget_window: u64,

    /// Largest change in bits per retarget.
    pub max_retarget_step: u32,

    pub min_difficulty: u32,

    pub max_difficulty: u32,

    /// Transfers per block, not counting the reward.
    pub max_transactions_per_block: usize,

    /// Subsidy of the first era, in base units.
    pub block_reward: u64,

    /// Blocks per subsidy era; the subsidy halves at each boundary.
    pub halving_interval: u64,

    /// Whether a block may carry only its reward.
    pub allow_empty_blocks: bool,

    /// Hashes between cancellation checks during nonce search.
    pub cancel_check_interval: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: 16,
            target_block_time_ms: 600_000,
            retarget_window: 10,
            max_retarget_step: 2,
            min_difficulty: 1,
            max_difficulty: 64,
            max_transactions_per_block: 10,
            block_reward: 50 * COIN,
            halving_interval: 210_000,
            allow_empty_blocks: false,
            cancel_check_interval: 4096,
        }
    }
}

impl ChainConfig {
    /// Low, bounded difficulty so fixtures mine in microseconds.
    pub fn for_testing() -> Self {
        Self {
            initial_difficulty: 4,
            target_block_time_ms: 1_000,
            retarget_window: 5,
            max_retarget_step: 2,
            min_difficulty: 1,
            max_difficulty: 8,
            allow_empty_blocks: true,
            cancel_check_interval: 64,
            ..Self::default()
        }
    }

    /// Check the parameters are usable together.
    ///
    /// Not called by deserialization or by [`crate::Chain::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retarget_window < 2 {
            return Err(ConfigError::RetargetWindowTooSmall(self.retarget_window));
        }
        if self.min_difficulty > self.max_difficulty {
            return Err(ConfigError::DifficultyBounds {
                min: self.min_difficulty,
                max: self.max_difficulty,
            });
        }
        if self.max_difficulty > 256 {
            return Err(ConfigError::DifficultyTooHigh(self.max_difficulty));
        }
        if !(self.min_difficulty..=self.max_difficulty).contains(&self.initial_difficulty) {
            return Err(ConfigError::InitialDifficultyOutOfBounds {
                initial: self.initial_difficulty,
                min: self.min_difficulty,
                max: self.max_difficulty,
            });
        }
        Ok(())
    }

    /// Subsidy for the block at `height`.
    pub fn mining_subsidy(&self, height: u64) -> u64 {
        mining_subsidy(height, self.block_reward, self.halving_interval)
    }
}

/// `block_reward` halved once per elapsed `halving_interval`.
pub fn mining_subsidy(height: u64, block_reward: u64, halving_interval: u64) -> u64 {
    if halving_interval == 0 {
        return block_reward;
    }
    let halvings = height / halving_interval;
    if halvings >= 64 {
        0
    } else {
        block_reward >> halvings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsidy_halves() {
        let config = ChainConfig::default();
        assert_eq!(config.mining_subsidy(1), 50 * COIN);
        assert_eq!(config.mining_subsidy(209_999), 50 * COIN);
        assert_eq!(config.mining_subsidy(210_000), 25 * COIN);
        assert_eq!(config.mining_subsidy(420_000), 25 * COIN / 2);
        assert_eq!(config.mining_subsidy(210_000 * 64), 0);
    }

    #[test]
    fn test_zero_interval_never_halves() {
        assert_eq!(mining_subsidy(u64::MAX, 7, 0), 7);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ChainConfig =
            serde_json::from_str(r#"{ "initial_difficulty": 3, "allow_empty_blocks": true }"#)
                .unwrap();
        assert_eq!(config.initial_difficulty, 3);
        assert!(config.allow_empty_blocks);
        assert_eq!(config.retarget_window, 10);
    }

    #[test]
    fn test_presets_are_valid() {
        assert_eq!(ChainConfig::default().validate(), Ok(()));
        assert_eq!(ChainConfig::for_testing().validate(), Ok(()));
    }

    #[test]
    fn test_short_retarget_window_is_rejected() {
        for window in [0, 1] {
            let config = ChainConfig {
                retarget_window: window,
                ..ChainConfig::for_testing()
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::RetargetWindowTooSmall(window))
            );
        }
        let config = ChainConfig {
            retarget_window: 2,
            ..ChainConfig::for_testing()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_difficulty_bounds_are_checked() {
        let inverted = ChainConfig {
            min_difficulty: 9,
            max_difficulty: 8,
            ..ChainConfig::for_testing()
        };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::DifficultyBounds { min: 9, max: 8 })
        );

        let too_hard = ChainConfig {
            initial_difficulty: 12,
            ..ChainConfig::for_testing()
        };
        assert!(matches!(
            too_hard.validate(),
            Err(ConfigError::InitialDifficultyOutOfBounds { initial: 12, .. })
        ));

        let beyond_hash = ChainConfig {
            max_difficulty: 257,
            ..ChainConfig::default()
        };
        assert_eq!(beyond_hash.validate(), Err(ConfigError::DifficultyTooHigh(257)));
    }
}
