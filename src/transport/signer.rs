//! Signer abstraction
//!
//! This module provides an async signer interface that supports:
//! - Local keypair signing
//! - Wallet adapters / remote signers (implemented outside this crate)
//!
//! Signers receive the bincode-serialized `VersionedTransaction` and return
//! the same transaction with their signature filled in.
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use thiserror::Error;
use zeroize::Zeroize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user (or wallet policy) declined to sign
    #[error("Signing rejected: {0}")]
    Rejected(String),

    /// The signer could not produce a signature
    #[error("Signing failed: {0}")]
    Failed(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Async signer capability
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Public key this signer signs for (also the fee payer)
    fn pubkey(&self) -> Pubkey;

    /// Signs serialized transaction bytes.
    async fn sign(&self, transaction_bytes: &[u8]) -> Result<Vec<u8>, SignerError>;
}

/// Local keypair signer
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        // Validate length
        if bytes.len() != 64 {
            return Err(SignerError::InvalidKey(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        // Reject all-zero keys
        if bytes.iter().all(|&b| b == 0) {
            return Err(SignerError::InvalidKey(
                "all-zero key rejected".to_string(),
            ));
        }
        Keypair::try_from(bytes)
            .map(Self::new)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))
    }

    /// Parses the base58 secret key format wallets export.
    pub fn from_base58(encoded: &str) -> Result<Self, SignerError> {
        let mut bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| SignerError::InvalidKey(format!("base58: {}", e)))?;
        let signer = Self::from_bytes(&bytes);
        bytes.zeroize();
        signer
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign(&self, transaction_bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
        sign_with_keypair(&self.keypair, transaction_bytes)
    }
}

/// Places `keypair`'s signature into its slot among the required signers.
pub(crate) fn sign_with_keypair(
    keypair: &Keypair,
    transaction_bytes: &[u8],
) -> Result<Vec<u8>, SignerError> {
    let mut tx: VersionedTransaction = bincode::deserialize(transaction_bytes)
        .map_err(|e| SignerError::Failed(format!("undecodable transaction: {}", e)))?;

    let required = tx.message.header().num_required_signatures as usize;
    let slot = tx
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == keypair.pubkey())
        .ok_or_else(|| {
            SignerError::Failed(format!("{} is not a required signer", keypair.pubkey()))
        })?;

    if tx.signatures.len() < required {
        tx.signatures.resize(required, Default::default());
    }
    tx.signatures[slot] = keypair.sign_message(&tx.message.serialize());

    bincode::serialize(&tx).map_err(|e| SignerError::Failed(e.to_string()))
}
