//! Perps Client - Solana perpetuals trading core
//!
//! Turns trading intents (swap, add/remove liquidity, open/close position)
//! into instructions for the perpetuals program, submits them atomically and
//! classifies every failure into a user-facing [`Diagnosis`].
//!
//! Flow: [`AddressResolver`] → [`InstructionBuilder`] → [`TransactionComposer`]
//! → [`TransactionExecutor`], with the [`ErrorClassifier`] consuming executor
//! failures. [`PerpsClient`] wires all of them over injected capabilities.

pub mod address;
pub mod client;
pub mod config;
pub mod diagnosis;
pub mod executor;
pub mod metrics;
pub mod observability;
pub mod program;
pub mod transport;
pub mod tx_builder;
pub mod types;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use address::AddressResolver;
pub use client::PerpsClient;
pub use config::{ClientConfig, ConfigError};
pub use diagnosis::{Diagnosis, DiagnosisKind, ErrorClassifier, Failure, Shortfall};
pub use executor::{TransactionComposer, TransactionExecutor};
pub use program::ProgramContract;
pub use transport::{
    Freshness, KeypairSigner, RpcTransport, TransactionSigner, Transport, TransportError,
};
pub use tx_builder::{InstructionBuilder, Operation, SlippageTolerance, TransactionBuilderError};
pub use types::Side;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
