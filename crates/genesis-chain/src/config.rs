//! Node configuration.

use genesis_chain_consensus::ChainConfig;
use genesis_chain_sigcache::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a [`crate::Node`].
///
/// Every field has a default, so a JSON document only needs the values it
/// changes:
///
/// ```
/// use genesis_chain::NodeConfig;
///
/// let config = NodeConfig::from_json_str(r#"{ "chain": { "initial_difficulty": 8 } }"#).unwrap();
/// assert_eq!(config.chain.initial_difficulty, 8);
/// assert!(config.verify_on_submit);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Consensus parameters.
    pub chain: ChainConfig,
    /// Signature cache sizing.
    pub cache: CacheConfig,
    /// Whether to check ids and signatures before a transaction enters the
    /// pool. Mining re-checks them either way.
    pub verify_on_submit: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            cache: CacheConfig::default(),
            verify_on_submit: true,
        }
    }
}

impl NodeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.chain.validate()?;
        Ok(config)
    }

    /// Low difficulty and small caches, for tests.
    pub fn for_testing() -> Self {
        Self {
            chain: ChainConfig::for_testing(),
            cache: CacheConfig::for_testing(),
            verify_on_submit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use genesis_chain_consensus::ConfigError;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(NodeConfig::from_json_str("{}").unwrap(), NodeConfig::default());
    }

    #[test]
    fn test_partial_overrides() {
        let config = NodeConfig::from_json_str(
            r#"{
                "verify_on_submit": false,
                "cache": { "verification_capacity": 10 },
                "chain": { "retarget_window": 20, "allow_empty_blocks": true }
            }"#,
        )
        .unwrap();

        assert!(!config.verify_on_submit);
        assert_eq!(config.cache.verification_capacity, 10);
        assert_eq!(config.cache.shards, CacheConfig::default().shards);
        assert_eq!(config.chain.retarget_window, 20);
        assert!(config.chain.allow_empty_blocks);
        assert_eq!(config.chain.initial_difficulty, ChainConfig::default().initial_difficulty);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(NodeConfig::from_json_str("{ chain: }").is_err());
        assert!(NodeConfig::from_json_str(r#"{ "verify_on_submit": "yes" }"#).is_err());
    }

    #[test]
    fn test_unusable_chain_parameters_are_rejected() {
        let err = NodeConfig::from_json_str(r#"{ "chain": { "retarget_window": 1 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidConfig(ConfigError::RetargetWindowTooSmall(1))
        ));

        let err = NodeConfig::from_json_str(r#"{ "chain": { "initial_difficulty": 100 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidConfig(ConfigError::InitialDifficultyOutOfBounds { .. })
        ));
    }
}
