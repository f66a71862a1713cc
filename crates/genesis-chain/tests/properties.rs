//! Property tests across signatures, the cache, mining and conflict resolution.

use std::sync::Arc;

use proptest::prelude::*;

use genesis_chain::consensus::{is_valid_block, ChainConfig};
use genesis_chain::core::{
    merkle_root, Digest, KeyPair, SignatureEngine, Verifier, SIGNATURE_LEN,
};
use genesis_chain::sigcache::{BatchItem, CacheConfig, SignatureCache};
use genesis_chain_testkit::generators::{keypair, message};
use genesis_chain_testkit::{fork_of, ChainFixture, TestFixture};

/// How a case corrupts an otherwise valid (message, signature, key) triple.
#[derive(Debug, Clone, Copy)]
enum Corruption {
    None,
    FlipByte(usize),
    OtherMessage,
    OtherKey,
    Truncate,
}

fn corruption() -> impl Strategy<Value = Corruption> {
    prop_oneof![
        Just(Corruption::None),
        (0..SIGNATURE_LEN).prop_map(Corruption::FlipByte),
        Just(Corruption::OtherMessage),
        Just(Corruption::OtherKey),
        Just(Corruption::Truncate),
    ]
}

/// Returns (message, signature bytes, public key bytes) after applying `corruption`.
fn triple(kp: &KeyPair, msg: &[u8], corruption: Corruption) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let engine = SignatureEngine::new();
    let sig = engine.sign(msg, kp.private_key().as_bytes()).unwrap();
    let mut msg = msg.to_vec();
    let mut sig = sig.as_bytes().to_vec();
    let mut pk = kp.public_key().as_bytes().to_vec();

    match corruption {
        Corruption::None => {}
        Corruption::FlipByte(i) => sig[i] ^= 0x01,
        Corruption::OtherMessage => msg.push(0x00),
        Corruption::OtherKey => pk[0] ^= 0x80,
        Corruption::Truncate => {
            sig.pop();
        }
    }
    (msg, sig, pk)
}

proptest! {
    #[test]
    fn sign_then_verify(kp in keypair(), msg in message(256)) {
        let engine = SignatureEngine::new();
        let sig = engine.sign(&msg, kp.private_key().as_bytes()).unwrap();
        prop_assert!(engine.verify(&msg, sig.as_bytes(), kp.public_key().as_bytes()));
    }

    #[test]
    fn any_byte_flip_rejects(
        kp in keypair(),
        msg in message(64),
        index in 0..SIGNATURE_LEN,
        mask in 1u8..=255,
    ) {
        let engine = SignatureEngine::new();
        let sig = engine.sign(&msg, kp.private_key().as_bytes()).unwrap();
        let mut bytes = *sig.as_bytes();
        bytes[index] ^= mask;
        prop_assert!(!engine.verify(&msg, &bytes, kp.public_key().as_bytes()));
    }

    #[test]
    fn unrelated_key_rejects(kp in keypair(), other in keypair(), msg in message(64)) {
        prop_assume!(kp.public_key() != other.public_key());
        let engine = SignatureEngine::new();
        let sig = engine.sign(&msg, kp.private_key().as_bytes()).unwrap();
        prop_assert!(!engine.verify(&msg, sig.as_bytes(), other.public_key().as_bytes()));
    }

    #[test]
    fn repeated_signatures_differ_and_verify(kp in keypair(), msg in message(64)) {
        let engine = SignatureEngine::new();
        let a = engine.sign(&msg, kp.private_key().as_bytes()).unwrap();
        let b = engine.sign(&msg, kp.private_key().as_bytes()).unwrap();
        prop_assert_ne!(a, b);
        prop_assert!(engine.verify(&msg, a.as_bytes(), kp.public_key().as_bytes()));
        prop_assert!(engine.verify(&msg, b.as_bytes(), kp.public_key().as_bytes()));
    }

    #[test]
    fn random_bytes_never_verify(
        kp in keypair(),
        msg in message(64),
        junk in prop::collection::vec(any::<u8>(), SIGNATURE_LEN),
    ) {
        prop_assert!(!SignatureEngine::new().verify(&msg, &junk, kp.public_key().as_bytes()));
    }

    #[test]
    fn batch_matches_sequential(
        cases in prop::collection::vec((keypair(), message(32), corruption()), 0..24),
    ) {
        let triples: Vec<_> = cases
            .iter()
            .map(|(kp, msg, c)| triple(kp, msg, *c))
            .collect();
        let items: Vec<BatchItem<'_>> = triples
            .iter()
            .map(|(m, s, p)| BatchItem::new(m, s, p))
            .collect();

        let cache = SignatureCache::new(&CacheConfig::for_testing());
        let batched = cache.batch_verify(&items);

        let engine = SignatureEngine::new();
        let sequential: Vec<bool> = triples
            .iter()
            .map(|(m, s, p)| engine.verify(m, s, p))
            .collect();
        prop_assert_eq!(batched, sequential);
    }

    #[test]
    fn merkle_root_commits_to_every_leaf(
        leaves in prop::collection::vec(any::<[u8; 32]>(), 1..20),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let leaves: Vec<Digest> = leaves.into_iter().map(Digest::from_bytes).collect();
        let mut altered = leaves.clone();
        let i = index.index(altered.len());
        altered[i].0[0] ^= 1 << bit;
        prop_assert_ne!(merkle_root(&leaves), merkle_root(&altered));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn cached_agrees_with_uncached(kp in keypair(), msg in message(32), c in corruption()) {
        let cache = SignatureCache::new(&CacheConfig::for_testing());
        let (m, s, p) = triple(&kp, &msg, c);

        let uncached = SignatureEngine::new().verify(&m, &s, &p);
        prop_assert_eq!(cache.verify(&m, &s, &p), uncached);
        // Second answer comes from the cache.
        prop_assert_eq!(cache.verify(&m, &s, &p), uncached);
        prop_assert_eq!(cache.verify_uncached(&m, &s, &p), uncached);
        prop_assert_eq!(matches!(c, Corruption::None), uncached);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn mined_blocks_meet_difficulty_and_resist_edits(amount in 1u64..1_000, fee in 0u64..10) {
        let fixture = ChainFixture::new();
        let alice = TestFixture::with_seed([0xa1; 32]);
        let bob = TestFixture::with_seed([0xb0; 32]);
        let tx = alice.transfer(bob.public_key(), amount, fee, 0);

        let parent = fixture.chain.tip();
        let block = fixture.mine_block(&[tx]).unwrap();
        let verifier = SignatureEngine::new();
        let config = fixture.chain.config();

        prop_assert!(block.hash.leading_zero_bits() >= block.difficulty);
        prop_assert!(is_valid_block(&block, &parent, &verifier, config));

        let mut earlier_nonce = (*block).clone();
        earlier_nonce.nonce = block.nonce.wrapping_sub(1);
        prop_assert!(!is_valid_block(&earlier_nonce, &parent, &verifier, config));

        // Even with the hash recomputed, a smaller nonce lacks the work.
        if block.nonce > 0 {
            earlier_nonce.hash = earlier_nonce.compute_hash();
            prop_assert!(!is_valid_block(&earlier_nonce, &parent, &verifier, config));
        }

        let mut edited_amount = (*block).clone();
        edited_amount.transactions[0].amount += 1;
        prop_assert!(!is_valid_block(&edited_amount, &parent, &verifier, config));

        let mut dropped = (*block).clone();
        dropped.transactions.remove(0);
        prop_assert!(!is_valid_block(&dropped, &parent, &verifier, config));
    }

    #[test]
    fn conflict_resolution_is_all_or_nothing(extra in 3usize..6, bad in any::<prop::sample::Index>()) {
        let local = ChainFixture::new();
        local.mine_empty(2).unwrap();
        let before = local.blocks();

        let mut candidate = fork_of(&before, 1, extra);
        let bad = 1 + bad.index(extra);
        candidate[bad].nonce = candidate[bad].nonce.wrapping_add(1);

        prop_assert!(local.chain.resolve_conflict(&candidate).is_err());
        prop_assert_eq!(local.blocks(), before.clone());

        let valid = fork_of(&before, 1, extra);
        let outcome = local.chain.resolve_conflict(&valid).unwrap();
        prop_assert_eq!(outcome.adopted.len(), extra);
        prop_assert_eq!(local.blocks(), valid);
    }
}

#[test]
fn chain_verifier_can_be_a_shared_cache() {
    let cache = Arc::new(SignatureCache::new(&CacheConfig::for_testing()));
    let verifier: Arc<dyn Verifier> = cache.clone();
    let fixture = ChainFixture::with_config(ChainConfig::for_testing());
    let chain = genesis_chain::consensus::Chain::new(fixture.chain.config().clone(), verifier);

    let alice = TestFixture::with_seed([0xa1; 32]);
    let bob = TestFixture::with_seed([0xb0; 32]);
    fixture
        .mine_block(&[alice.transfer(bob.public_key(), 3, 0, 0)])
        .unwrap();

    let blocks = fixture.blocks();
    let outcome = chain.resolve_conflict(&blocks).unwrap();
    assert_eq!(outcome.adopted.len(), 1);
    assert_eq!(cache.stats().verification_misses, 1);
}
