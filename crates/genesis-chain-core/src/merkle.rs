//! Binary Merkle commitment over an ordered sequence of leaves.
//!
//! At each level an odd trailing node is paired with itself. A single leaf
//! is its own root. The empty sequence commits to a fixed domain digest.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

const EMPTY_DOMAIN: &str = "genesis-chain-merkle-empty";

/// Root committed to by a block with no transactions.
pub fn empty_root() -> Digest {
    Digest::hash_domain(EMPTY_DOMAIN, &[])
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    Digest::hash_parts(&[left.as_bytes(), right.as_bytes()])
}

fn next_level(level: &[Digest]) -> Vec<Digest> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_pair(left, right)
        })
        .collect()
}

/// Compute the Merkle root of `leaves`.
pub fn merkle_root(leaves: &[Digest]) -> Digest {
    if leaves.is_empty() {
        return empty_root();
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// One sibling on the path from a leaf to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    /// Whether the sibling sits to the left of the running hash.
    pub sibling_is_left: bool,
}

/// Inclusion proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub steps: Vec<ProofStep>,
}

/// Build an inclusion proof for `leaves[index]`, or `None` if out of range.
pub fn merkle_proof(leaves: &[Digest], index: usize) -> Option<MerkleProof> {
    if index >= leaves.len() {
        return None;
    }

    let mut steps = Vec::new();
    let mut level = leaves.to_vec();
    let mut position = index;

    while level.len() > 1 {
        let sibling_index = if position % 2 == 0 { position + 1 } else { position - 1 };
        // Odd tail pairs with itself.
        let sibling = level.get(sibling_index).copied().unwrap_or(level[position]);
        steps.push(ProofStep {
            sibling,
            sibling_is_left: position % 2 == 1,
        });
        level = next_level(&level);
        position /= 2;
    }

    Some(MerkleProof {
        leaf_index: index,
        steps,
    })
}

/// Check that `leaf` is committed to by `root` through `proof`.
pub fn verify_merkle_proof(leaf: &Digest, proof: &MerkleProof, root: &Digest) -> bool {
    let mut running = *leaf;
    for step in &proof.steps {
        running = if step.sibling_is_left {
            hash_pair(&step.sibling, &running)
        } else {
            hash_pair(&running, &step.sibling)
        };
    }
    running == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n).map(|i| Digest::hash(&(i as u64).to_be_bytes())).collect()
    }

    #[test]
    fn test_single_leaf_is_root() {
        let l = leaves(1);
        assert_eq!(merkle_root(&l), l[0]);
    }

    #[test]
    fn test_empty_root_is_fixed() {
        assert_eq!(merkle_root(&[]), empty_root());
        assert_ne!(empty_root(), Digest::ZERO);
    }

    #[test]
    fn test_odd_leaf_is_duplicated() {
        let l = leaves(3);
        let expected = hash_pair(&hash_pair(&l[0], &l[1]), &hash_pair(&l[2], &l[2]));
        assert_eq!(merkle_root(&l), expected);

        let padded = vec![l[0], l[1], l[2], l[2]];
        assert_eq!(merkle_root(&l), merkle_root(&padded));
    }

    #[test]
    fn test_order_matters() {
        let l = leaves(2);
        let swapped = vec![l[1], l[0]];
        assert_ne!(merkle_root(&l), merkle_root(&swapped));
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        for n in 1..=9 {
            let l = leaves(n);
            let root = merkle_root(&l);
            for i in 0..n {
                let proof = merkle_proof(&l, i).unwrap();
                assert!(verify_merkle_proof(&l[i], &proof, &root), "n={} i={}", n, i);
            }
        }
    }

    proptest::proptest! {
        #[test]
        fn test_any_leaf_proves_membership(
            raw in proptest::collection::vec(proptest::prelude::any::<[u8; 32]>(), 1..40),
            pick in proptest::prelude::any::<proptest::sample::Index>(),
        ) {
            let l: Vec<Digest> = raw.into_iter().map(Digest::from_bytes).collect();
            let i = pick.index(l.len());
            let proof = merkle_proof(&l, i).unwrap();
            proptest::prop_assert!(verify_merkle_proof(&l[i], &proof, &merkle_root(&l)));
        }
    }

    #[test]
    fn test_proof_rejects_wrong_leaf() {
        let l = leaves(5);
        let root = merkle_root(&l);
        let proof = merkle_proof(&l, 2).unwrap();
        assert!(!verify_merkle_proof(&l[3], &proof, &root));
        assert!(merkle_proof(&l, 5).is_none());
    }
}
