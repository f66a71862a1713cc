//! Transactions: value transfers signed by their sender, and the unsigned
//! reward a miner credits to itself.
//!
//! A transaction is created pending, included in exactly one block, and is
//! immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::canonical::transaction_signing_bytes;
use crate::digest::Digest;
use crate::error::CoreError;
use crate::signature::{KeyPair, PublicKey, Signature, Signer, Verifier};
use crate::types::TxId;

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// What a transaction does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Value moved from sender to recipient, signed by the sender.
    Transfer = 0,
    /// Block reward. Sender is `PublicKey::ZERO`, no signature.
    Reward = 1,
}

impl TransactionKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Transfer),
            1 => Some(Self::Reward),
            _ => None,
        }
    }
}

/// A chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// `H(signing bytes)`.
    pub id: TxId,

    pub kind: TransactionKind,

    pub sender: PublicKey,

    pub recipient: PublicKey,

    /// Amount in base units.
    pub amount: u64,

    /// Fee paid to the miner, in base units.
    pub fee: u64,

    /// Sender-claimed creation time (Unix milliseconds).
    pub timestamp: i64,

    /// Sender-chosen nonce distinguishing otherwise identical transfers.
    /// For rewards this is the block height.
    pub nonce: u64,

    /// Sender's signature over the signing bytes. `None` for rewards.
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Build the reward transaction for a block at `height`.
    pub fn reward(recipient: PublicKey, amount: u64, height: u64, timestamp: i64) -> Self {
        let mut tx = Self {
            id: TxId::ZERO,
            kind: TransactionKind::Reward,
            sender: PublicKey::ZERO,
            recipient,
            amount,
            fee: 0,
            timestamp,
            nonce: height,
            signature: None,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Canonical bytes of every field except `id` and `signature`.
    pub fn signing_bytes(&self) -> Vec<u8> {
        transaction_signing_bytes(self)
    }

    /// Recompute the id from the current field values.
    pub fn compute_id(&self) -> TxId {
        TxId::from(Digest::hash(&self.signing_bytes()))
    }

    /// Merkle leaf: `H(signing bytes || signature)`.
    ///
    /// Commits to the signature so a block cannot swap it after mining.
    pub fn leaf_hash(&self) -> Digest {
        let body = self.signing_bytes();
        match &self.signature {
            Some(sig) => Digest::hash_parts(&[&body, sig.as_bytes()]),
            None => Digest::hash(&body),
        }
    }

    pub fn is_reward(&self) -> bool {
        self.kind == TransactionKind::Reward
    }

    /// Check the sender's signature through `verifier`.
    ///
    /// Rewards carry no signature and always return false here; block
    /// validation handles them separately.
    pub fn verify_signature(&self, verifier: &dyn Verifier) -> bool {
        if self.is_reward() {
            return false;
        }
        match &self.signature {
            Some(sig) => verifier.verify(&self.signing_bytes(), sig.as_bytes(), self.sender.as_bytes()),
            None => false,
        }
    }

    /// Total value leaving the sender.
    pub fn total_debit(&self) -> Option<u64> {
        self.amount.checked_add(self.fee)
    }
}

/// Builder for signed transfers.
pub struct TransactionBuilder {
    sender: PublicKey,
    recipient: PublicKey,
    amount: u64,
    fee: u64,
    timestamp: i64,
    nonce: u64,
}

impl TransactionBuilder {
    /// Start building a transfer.
    pub fn new(sender: PublicKey, recipient: PublicKey, amount: u64) -> Self {
        Self {
            sender,
            recipient,
            amount,
            fee: 0,
            timestamp: 0,
            nonce: 0,
        }
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Build and sign the transfer.
    ///
    /// Fails with `InvalidInput` if `keypair` does not own the sender key.
    pub fn sign(self, signer: &dyn Signer, keypair: &KeyPair) -> Result<Transaction, CoreError> {
        if keypair.public_key() != self.sender {
            return Err(CoreError::InvalidInput(
                "keypair does not match transaction sender".into(),
            ));
        }

        let mut tx = Transaction {
            id: TxId::ZERO,
            kind: TransactionKind::Transfer,
            sender: self.sender,
            recipient: self.recipient,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
            nonce: self.nonce,
            signature: None,
        };

        let body = tx.signing_bytes();
        tx.id = TxId::from(Digest::hash(&body));
        tx.signature = Some(signer.sign(&body, keypair.private_key().as_bytes())?);
        Ok(tx)
    }
}
