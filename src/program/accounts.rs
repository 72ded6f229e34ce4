//! Account layouts read by the client
//!
//! Only the leading fields are modelled. Borsh decoding stops once these are
//! read, so fields appended by later program versions do not break decoding.

use super::discriminator;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors produced while decoding raw account data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountDecodeError {
    #[error("account data too short: {len} bytes")]
    TooShort { len: usize },

    #[error("unexpected discriminator for {expected}")]
    Discriminator { expected: &'static str },

    #[error("malformed {account} layout: {reason}")]
    Layout {
        account: &'static str,
        reason: String,
    },
}

/// Oracle configuration embedded in a custody
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct OracleParams {
    pub oracle_account: Pubkey,
    pub oracle_type: u8,
    pub max_price_error: u64,
    pub max_price_age_sec: u32,
}

/// Leading fields of the on-chain `Custody` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CustodyAccount {
    pub pool: Pubkey,
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub decimals: u8,
    pub is_stable: bool,
    pub oracle: OracleParams,
}

/// Leading fields of the on-chain `Pool` account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PoolAccount {
    pub name: String,
    /// Custodies in the pool's declared order
    pub custodies: Vec<Pubkey>,
}

impl CustodyAccount {
    pub const NAME: &'static str = "Custody";

    pub fn decode(data: &[u8]) -> Result<Self, AccountDecodeError> {
        decode_account(Self::NAME, data)
    }

    /// Discriminator-prefixed bytes as the program stores them.
    pub fn to_account_data(&self) -> Vec<u8> {
        encode_account(Self::NAME, self)
    }
}

impl PoolAccount {
    pub const NAME: &'static str = "Pool";

    pub fn decode(data: &[u8]) -> Result<Self, AccountDecodeError> {
        decode_account(Self::NAME, data)
    }

    pub fn to_account_data(&self) -> Vec<u8> {
        encode_account(Self::NAME, self)
    }
}

fn decode_account<T: BorshDeserialize>(
    name: &'static str,
    data: &[u8],
) -> Result<T, AccountDecodeError> {
    if data.len() < 8 {
        return Err(AccountDecodeError::TooShort { len: data.len() });
    }
    if data[..8] != discriminator("account", name) {
        return Err(AccountDecodeError::Discriminator { expected: name });
    }

    let mut body = &data[8..];
    T::deserialize(&mut body).map_err(|e| AccountDecodeError::Layout {
        account: name,
        reason: e.to_string(),
    })
}

fn encode_account<T: BorshSerialize>(name: &'static str, value: &T) -> Vec<u8> {
    let mut data = discriminator("account", name).to_vec();
    // Writing into a Vec is infallible.
    let _ = value.serialize(&mut data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_custody() -> CustodyAccount {
        CustodyAccount {
            pool: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            token_account: Pubkey::new_unique(),
            decimals: 9,
            is_stable: false,
            oracle: OracleParams {
                oracle_account: Pubkey::new_unique(),
                oracle_type: 1,
                max_price_error: 10_000,
                max_price_age_sec: 60,
            },
        }
    }

    #[test]
    fn test_custody_decode_ignores_trailing_fields() {
        let custody = sample_custody();
        let mut data = custody.to_account_data();
        // fee/borrow-rate state that newer layouts append
        data.extend_from_slice(&[7u8; 128]);

        assert_eq!(CustodyAccount::decode(&data).unwrap(), custody);
    }

    #[test]
    fn test_decode_rejects_wrong_discriminator() {
        let pool = PoolAccount {
            name: "main".to_string(),
            custodies: vec![Pubkey::new_unique()],
        };
        let data = pool.to_account_data();

        let err = CustodyAccount::decode(&data).unwrap_err();
        assert_eq!(err, AccountDecodeError::Discriminator { expected: "Custody" });
    }

    #[test]
    fn test_decode_short_data() {
        let err = PoolAccount::decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, AccountDecodeError::TooShort { len: 3 });
    }

    #[test]
    fn test_pool_custody_order_preserved() {
        let custodies: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let pool = PoolAccount {
            name: "main".to_string(),
            custodies: custodies.clone(),
        };

        let decoded = PoolAccount::decode(&pool.to_account_data()).unwrap();
        assert_eq!(decoded.custodies, custodies);
    }
}
