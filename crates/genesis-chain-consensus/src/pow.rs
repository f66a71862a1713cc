//! Proof-of-work nonce search.

use genesis_chain_core::{BlockHash, BlockHeader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::MiningError;

/// Caller-held cancellation signal for a nonce search.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Whether `hash` has at least `difficulty` leading zero bits.
pub fn meets_difficulty(hash: &BlockHash, difficulty: u32) -> bool {
    hash.leading_zero_bits() >= difficulty
}

/// Outcome of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub hash: BlockHash,
    pub attempts: u64,
}

/// Find the smallest nonce, starting from 0, whose header hash meets the
/// header's difficulty.
///
/// Checks `cancel` every `check_interval` hashes. Takes no locks; the header
/// is an immutable template.
pub fn search_nonce(
    header: &BlockHeader,
    cancel: &CancelToken,
    check_interval: u64,
) -> Result<Solution, MiningError> {
    let interval = check_interval.max(1);
    let prefix = header.prefix_hasher();
    let mut nonce = 0u64;

    loop {
        if nonce % interval == 0 {
            if cancel.is_cancelled() {
                debug!(index = header.index, attempts = nonce, "nonce search cancelled");
                return Err(MiningError::Aborted);
            }
            if nonce > 0 {
                debug!(
                    index = header.index,
                    difficulty = header.difficulty,
                    attempts = nonce,
                    "nonce search progress"
                );
            }
        }

        let hash = header.hash_with_nonce(&prefix, nonce);
        if meets_difficulty(&hash, header.difficulty) {
            return Ok(Solution {
                nonce,
                hash,
                attempts: nonce + 1,
            });
        }

        nonce = match nonce.checked_add(1) {
            Some(next) => next,
            None => return Err(MiningError::NonceSpaceExhausted),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_chain_core::Block;

    fn header(difficulty: u32) -> BlockHeader {
        let mut header = Block::genesis().header();
        header.index = 1;
        header.previous_hash = Block::genesis().hash;
        header.difficulty = difficulty;
        header
    }

    #[test]
    fn test_solution_meets_difficulty() {
        for difficulty in 0..=10 {
            let mut h = header(difficulty);
            let solution = search_nonce(&h, &CancelToken::new(), 16).unwrap();
            assert!(solution.hash.leading_zero_bits() >= difficulty);

            h.nonce = solution.nonce;
            assert_eq!(h.compute_hash(), solution.hash);
        }
    }

    #[test]
    fn test_solution_is_first_valid_nonce() {
        let mut h = header(6);
        let solution = search_nonce(&h, &CancelToken::new(), 16).unwrap();
        for nonce in 0..solution.nonce {
            h.nonce = nonce;
            assert!(!meets_difficulty(&h.compute_hash(), 6));
        }
    }

    #[test]
    fn test_cancelled_search_aborts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        // 255 bits is unreachable in practice; only cancellation ends it.
        let result = search_nonce(&header(255), &cancel, 1);
        assert_eq!(result, Err(MiningError::Aborted));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = std::thread::spawn(move || search_nonce(&header(255), &remote, 128));
        std::thread::sleep(std::time::Duration::from_millis(20));
        cancel.cancel();
        assert_eq!(handle.join().unwrap(), Err(MiningError::Aborted));
    }
}
