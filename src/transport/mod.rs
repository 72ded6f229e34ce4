//! Transport and signer capabilities
//!
//! The trading core never owns a network client or key material. Both are
//! injected as trait objects:
//! - [`Transport`]: freshness token, raw submission, finality, account reads
//! - [`TransactionSigner`]: bytes in, signed bytes out (or a rejection)

pub mod rpc;
pub mod signer;

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature};
use thiserror::Error;

pub use rpc::RpcTransport;
pub use signer::{KeypairSigner, SignerError, TransactionSigner};

/// Failures reported by a [`Transport`]
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Request never produced a usable response (network, HTTP, JSON-RPC)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The cluster rejected or failed the transaction, either during
    /// preflight simulation or on-chain. `error` is the JSON form of the
    /// transaction error when the node supplied one.
    #[error("{message}")]
    Rejected {
        message: String,
        error: Option<serde_json::Value>,
        logs: Vec<String>,
    },

    /// The transaction never landed and its blockhash is no longer accepted
    #[error("Transaction expired: block height exceeded {last_valid_block_height} before {signature} landed")]
    BlockhashExpired {
        signature: Signature,
        last_valid_block_height: u64,
    },

    /// Finality was not observed within the polling budget
    #[error("Confirmation timed out after {waited_ms}ms for {signature}")]
    ConfirmationTimeout { signature: Signature, waited_ms: u64 },

    /// Response could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Rpc(_) => "rpc",
            Self::Rejected { .. } => "rejected",
            Self::BlockhashExpired { .. } => "expired",
            Self::ConfirmationTimeout { .. } => "timeout",
            Self::Decode(_) => "decode",
        }
    }
}

/// A blockhash and the last block height at which the cluster accepts it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Remote cluster access used by builders and the executor
#[async_trait]
pub trait Transport: Send + Sync {
    /// Most recent freshness token (blockhash) with its expiry height
    async fn latest_blockhash(&self) -> Result<Freshness, TransportError>;

    /// Submits already-signed transaction bytes as-is.
    async fn send_signed_bytes(&self, bytes: &[u8]) -> Result<Signature, TransportError>;

    /// Blocks until the transaction is finalized or has failed. A transaction
    /// still unseen once the chain passes `last_valid_block_height` fails with
    /// [`TransportError::BlockhashExpired`].
    async fn confirm(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), TransportError>;

    /// Raw account data, `None` when the account does not exist.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError>;

    /// Raw account data aligned positionally with `addresses`; absent accounts
    /// stay in place as `None`.
    async fn fetch_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Vec<u8>>>, TransportError>;
}
