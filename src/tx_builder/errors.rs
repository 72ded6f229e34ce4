//! Error types for instruction building and transaction composition
//!
//! Builders and the composer return these; nothing here is shown to a user
//! directly. Every variant converts into a [`Failure`](crate::diagnosis::Failure)
//! and is turned into a `Diagnosis` by the classifier.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::program::AccountDecodeError;
use crate::transport::{SignerError, TransportError};

/// Error type for building and composing operations
#[derive(Error, Debug, Clone)]
pub enum TransactionBuilderError {
    /// A required account does not exist yet
    #[error("Account not found: {what} {address}")]
    AccountNotFound { what: &'static str, address: Pubkey },

    /// An account exists but does not have the expected layout
    #[error("Failed to decode {what} {address}: {source}")]
    AccountDecode {
        what: &'static str,
        address: Pubkey,
        #[source]
        source: AccountDecodeError,
    },

    /// The pool has no custody for the requested mint
    #[error("Token {mint} is not supported by pool {pool}")]
    CustodyNotInPool { mint: Pubkey, pool: Pubkey },

    /// Failed to build an instruction for a specific primitive
    #[error("Instruction build error ({operation}): {reason}")]
    InstructionBuild {
        operation: &'static str,
        reason: String,
    },

    /// Slippage adjustment left the representable price range
    #[error("Price out of range: {0}")]
    PriceOutOfRange(String),

    /// Invalid builder/composer configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Message compilation failed (account limits, empty list)
    #[error("Transaction compile error: {0}")]
    Compile(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Signing(#[from] SignerError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl TransactionBuilderError {
    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::AccountNotFound { .. } => "account_missing",
            Self::AccountDecode { .. } => "account_layout",
            Self::CustodyNotInPool { .. } => "custody",
            Self::InstructionBuild { .. } => "instruction",
            Self::PriceOutOfRange(_) => "price",
            Self::Configuration(_) => "config",
            Self::Compile(_) => "compile",
            Self::Serialization(_) => "serialization",
            Self::Signing(_) => "signing",
            Self::Transport(_) => "transport",
        }
    }
}

// Convenience constructors for common error scenarios
impl TransactionBuilderError {
    pub fn account_not_found(what: &'static str, address: Pubkey) -> Self {
        Self::AccountNotFound { what, address }
    }

    pub fn instruction_failed(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            operation,
            reason: reason.into(),
        }
    }

    pub fn compile(reason: impl Into<String>) -> Self {
        Self::Compile(reason.into())
    }
}
