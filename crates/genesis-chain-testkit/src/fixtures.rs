//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use genesis_chain_consensus::{
    build_template, seal_template, CancelToken, Chain, ChainConfig, MiningError,
};
use genesis_chain_core::{
    Block, CoreError, EntropySource, KeyPair, PublicKey, SignatureEngine, Transaction,
    TransactionBuilder, TrustedSource,
};

/// Entropy source that repeats one byte. Makes signatures reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub u8);

impl EntropySource for FixedEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CoreError> {
        dest.fill(self.0);
        Ok(())
    }
}

/// Entropy source that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEntropy;

impl EntropySource for FailingEntropy {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), CoreError> {
        Err(CoreError::EntropySourceFailure("entropy source offline".into()))
    }
}

/// A party with a deterministic keypair.
pub struct TestFixture {
    pub keypair: KeyPair,
    pub engine: SignatureEngine,
}

impl TestFixture {
    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: KeyPair::from_seed(&seed),
            engine: SignatureEngine::new(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// A signed transfer from this party.
    pub fn transfer(&self, to: PublicKey, amount: u64, fee: u64, nonce: u64) -> Transaction {
        TransactionBuilder::new(self.public_key(), to, amount)
            .fee(fee)
            .nonce(nonce)
            .timestamp(1_000 + nonce as i64)
            .sign(&self.engine, &self.keypair)
            .expect("fixture keypair signs")
    }

    /// This party as a trusted source called `source_id`.
    pub fn trusted_source(&self, source_id: &str) -> TrustedSource {
        TrustedSource {
            source_id: source_id.to_string(),
            name: format!("{source_id} desk"),
            source_type: "news".into(),
            url: format!("https://{source_id}.example"),
            public_key: self.public_key(),
        }
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0xf1;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A chain at test difficulty with a fixed miner.
///
/// Blocks are stamped exactly one target interval apart, so retargets never
/// move the difficulty.
pub struct ChainFixture {
    pub chain: Chain,
    pub miner: PublicKey,
}

impl ChainFixture {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::for_testing())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            chain: Chain::new(config, Arc::new(SignatureEngine::new())),
            miner: KeyPair::from_seed(&[0xee; 32]).public_key(),
        }
    }

    /// Use a different reward address, so blocks mined here differ from
    /// those of another fixture at the same height.
    pub fn miner(mut self, miner: PublicKey) -> Self {
        self.miner = miner;
        self
    }

    /// Mine `transactions` on the tip and append the block.
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Arc<Block>, MiningError> {
        let tip = self.chain.tip();
        let timestamp = tip.timestamp + self.chain.config().target_block_time_ms as i64;
        let template = build_template(&self.chain, transactions, self.miner, timestamp)?;
        let block = seal_template(
            template,
            &CancelToken::new(),
            self.chain.config().cancel_check_interval,
        )?;
        Ok(self.chain.append(block)?)
    }

    /// Mine `count` reward-only blocks.
    pub fn mine_empty(&self, count: usize) -> Result<(), MiningError> {
        for _ in 0..count {
            self.mine_block(&[])?;
        }
        Ok(())
    }

    /// The main chain as owned blocks, genesis first.
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.blocks().iter().map(|b| (**b).clone()).collect()
    }
}

impl Default for ChainFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A competing chain: the first `shared` blocks of `base`, then `extra`
/// empty blocks mined by a different miner.
pub fn fork_of(base: &[Block], shared: usize, extra: usize) -> Vec<Block> {
    let fork = ChainFixture::with_config(ChainConfig::for_testing())
        .miner(KeyPair::from_seed(&[0xf0; 32]).public_key());
    if shared > 1 {
        fork.chain
            .resolve_conflict(&base[..shared])
            .expect("fork prefix is a valid chain");
    }
    fork.mine_empty(extra).expect("fork blocks mine");
    fork.blocks()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_entropy_signatures_repeat() {
        let engine = SignatureEngine::with_entropy(FixedEntropy(7));
        let party = KeyPair::from_seed(&[1; 32]);
        let a = engine.sign(b"msg", party.private_key().as_bytes()).unwrap();
        let b = engine.sign(b"msg", party.private_key().as_bytes()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.entropy(), [7u8; 32]);
    }

    #[test]
    fn test_failing_entropy() {
        let engine = SignatureEngine::with_entropy(FailingEntropy);
        assert!(matches!(
            engine.generate_keypair(),
            Err(CoreError::EntropySourceFailure(_))
        ));
    }

    #[test]
    fn test_parties_are_distinct() {
        let parties = multi_party_fixtures(3);
        assert_ne!(parties[0].public_key(), parties[1].public_key());
        assert_ne!(parties[1].public_key(), parties[2].public_key());
    }

    #[test]
    fn test_chain_fixture_and_fork() {
        let base = ChainFixture::new();
        base.mine_empty(3).unwrap();
        let blocks = base.blocks();
        assert_eq!(blocks.len(), 4);

        let fork = fork_of(&blocks, 2, 4);
        assert_eq!(fork.len(), 6);
        assert_eq!(fork[1], blocks[1]);
        assert_ne!(fork[2].hash, blocks[2].hash);
    }
}
