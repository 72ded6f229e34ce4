//! Remote perpetuals program contract
//!
//! Everything the client needs to agree with the on-chain program without
//! running any of its logic:
//! - **seeds**: derived-address seed prefixes
//! - **accounts**: the leading fields of the `Pool` and `Custody` layouts
//! - **args**: instruction discriminators and Borsh parameter structs
//! - **error_table**: custom error code → human message
//!
//! The contract is passed explicitly to builders and the classifier; there is
//! no process-wide program handle.

pub mod accounts;
pub mod args;
pub mod error_table;
pub mod seeds;

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

pub use accounts::{AccountDecodeError, CustodyAccount, OracleParams, PoolAccount};
pub use error_table::ErrorTable;

/// Program id of the public perpetuals deployment.
pub const DEFAULT_PROGRAM_ID: &str = "PERPHjGBqRHArX4DySjwM6UJHiR3sWAatqfdBS2qQJu";

/// Externally versioned description of the remote program.
#[derive(Debug, Clone)]
pub struct ProgramContract {
    /// Owning program id used for every derived address and instruction
    pub program_id: Pubkey,

    /// Custom error code table published alongside the program
    pub error_table: ErrorTable,
}

impl ProgramContract {
    pub fn new(program_id: Pubkey, error_table: ErrorTable) -> Self {
        Self {
            program_id,
            error_table,
        }
    }

    /// Contract for a deployment of the stock perpetuals program.
    pub fn perpetuals(program_id: Pubkey) -> Self {
        Self::new(program_id, ErrorTable::perpetuals())
    }
}

impl Default for ProgramContract {
    fn default() -> Self {
        // Constant literal; parsing cannot fail.
        let program_id = Pubkey::from_str(DEFAULT_PROGRAM_ID).unwrap_or_default();
        Self::perpetuals(program_id)
    }
}

/// Anchor-style 8 byte discriminator: `sha256("<namespace>:<name>")[..8]`.
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();

    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_is_stable_and_namespaced() {
        let a = discriminator("global", "open_position");
        let b = discriminator("global", "open_position");
        let c = discriminator("account", "open_position");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_default_contract_parses_program_id() {
        let contract = ProgramContract::default();
        assert_ne!(contract.program_id, Pubkey::default());
        assert_eq!(contract.program_id.to_string(), DEFAULT_PROGRAM_ID);
    }
}
