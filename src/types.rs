//! Common types used throughout the crate

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

use crate::program::CustodyAccount;

/// Position direction
///
/// The discriminants double as the position seed tag and the Borsh tag the
/// program expects (`0` is reserved for "none" on-chain).
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    Long = 1,
    Short = 2,
}

impl Side {
    /// Tag byte used as the last position seed component
    pub fn seed_tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Read-only snapshot of one custody, fetched per build and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodySnapshot {
    /// Address of the custody account itself
    pub address: Pubkey,
    pub pool: Pubkey,
    pub mint: Pubkey,
    /// Vault holding the pooled tokens
    pub token_account: Pubkey,
    pub oracle: Pubkey,
    pub decimals: u8,
}

impl CustodySnapshot {
    pub fn from_account(address: Pubkey, account: &CustodyAccount) -> Self {
        Self {
            address,
            pool: account.pool,
            mint: account.mint,
            token_account: account.token_account,
            oracle: account.oracle.oracle_account,
            decimals: account.decimals,
        }
    }
}

/// Snapshot of a pool with its custodies in the pool's declared order.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub address: Pubkey,
    pub name: String,
    pub custodies: Vec<CustodySnapshot>,
}

impl PoolSnapshot {
    pub fn custody_for_mint(&self, mint: &Pubkey) -> Option<&CustodySnapshot> {
        self.custodies.iter().find(|c| &c.mint == mint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_tags() {
        assert_eq!(Side::Long.seed_tag(), 1);
        assert_eq!(Side::Short.seed_tag(), 2);
        assert_eq!(borsh::to_vec(&Side::Short).unwrap(), vec![2]);
    }

    #[test]
    fn test_side_serde() {
        assert_eq!(serde_json::to_string(&Side::Long).unwrap(), "\"long\"");
        let side: Side = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(side, Side::Short);
    }
}
