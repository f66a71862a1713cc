//! Proptest generators for property-based testing.

use proptest::prelude::*;

use genesis_chain_core::{KeyPair, PublicKey, SignatureEngine, Transaction, TransactionBuilder};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = KeyPair> {
    any::<[u8; 32]>().prop_map(|seed| KeyPair::from_seed(&seed))
}

/// Generate a random public key.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate a non-empty message of at most `max_len` bytes.
pub fn message(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800_000i64
}

/// Parameters for generating a signed transfer.
#[derive(Debug, Clone)]
pub struct TransferParams {
    pub sender: KeyPair,
    pub recipient: PublicKey,
    pub amount: u64,
    pub fee: u64,
    pub nonce: u64,
    pub timestamp: i64,
}

impl Arbitrary for TransferParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            keypair(),
            public_key(),
            0u64..=1_000_000_000u64,
            0u64..=10_000u64,
            any::<u64>(),
            timestamp(),
        )
            .prop_map(|(sender, recipient, amount, fee, nonce, timestamp)| TransferParams {
                sender,
                recipient,
                amount,
                fee,
                nonce,
                timestamp,
            })
            .boxed()
    }
}

/// Build and sign a transfer from parameters.
pub fn transfer_from_params(params: &TransferParams) -> Transaction {
    TransactionBuilder::new(params.sender.public_key(), params.recipient, params.amount)
        .fee(params.fee)
        .nonce(params.nonce)
        .timestamp(params.timestamp)
        .sign(&SignatureEngine::new(), &params.sender)
        .expect("generated keypair signs")
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_transaction_id_ignores_signature(params: TransferParams) {
            let t1 = transfer_from_params(&params);
            let t2 = transfer_from_params(&params);

            prop_assert_eq!(t1.id, t2.id);
            prop_assert_ne!(t1.signature, t2.signature);
            prop_assert_ne!(t1.leaf_hash(), t2.leaf_hash());
        }

        #[test]
        fn test_generated_transfers_verify(params: TransferParams) {
            let tx = transfer_from_params(&params);
            prop_assert_eq!(tx.compute_id(), tx.id);
            prop_assert!(tx.verify_signature(&SignatureEngine::new()));
        }

        #[test]
        fn test_transaction_id_changes_with_amount(params: TransferParams) {
            let tx = transfer_from_params(&params);
            let mut altered = tx.clone();
            altered.amount = altered.amount.wrapping_add(1);
            prop_assert_ne!(altered.compute_id(), tx.id);
            prop_assert!(!altered.verify_signature(&SignatureEngine::new()));
        }
    }
}
