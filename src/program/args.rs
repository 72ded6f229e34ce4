//! Instruction parameter structs and their wire encoding
//!
//! Each payload is `discriminator("global", <name>) ++ borsh(params)`.

use super::discriminator;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::Side;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapParams {
    pub amount_in: u64,
    pub min_amount_out: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLiquidityParams {
    pub amount_in: u64,
    pub min_lp_amount_out: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveLiquidityParams {
    pub lp_amount_in: u64,
    pub min_amount_out: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenPositionParams {
    pub price: u64,
    pub collateral: u64,
    pub size: u64,
    pub side: Side,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosePositionParams {
    pub price: u64,
}

/// An instruction parameter struct with a fixed method name on the program.
pub trait InstructionArgs: BorshSerialize {
    const NAME: &'static str;

    fn to_payload(&self) -> Vec<u8> {
        let mut data = discriminator("global", Self::NAME).to_vec();
        // Writing into a Vec is infallible.
        let _ = self.serialize(&mut data);
        data
    }
}

impl InstructionArgs for SwapParams {
    const NAME: &'static str = "swap";
}

impl InstructionArgs for AddLiquidityParams {
    const NAME: &'static str = "add_liquidity";
}

impl InstructionArgs for RemoveLiquidityParams {
    const NAME: &'static str = "remove_liquidity";
}

impl InstructionArgs for OpenPositionParams {
    const NAME: &'static str = "open_position";
}

impl InstructionArgs for ClosePositionParams {
    const NAME: &'static str = "close_position";
}

/// Splits a payload back into its discriminator and decoded params.
pub fn decode_payload<T: InstructionArgs + BorshDeserialize>(data: &[u8]) -> Option<T> {
    if data.len() < 8 || data[..8] != discriminator("global", T::NAME) {
        return None;
    }
    T::try_from_slice(&data[8..]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_position_payload_layout() {
        let params = OpenPositionParams {
            price: 101_010_101,
            collateral: 5_000_000,
            size: 25_000_000,
            side: Side::Short,
        };
        let payload = params.to_payload();

        // 8 discriminator + 3 * u64 + 1 side tag
        assert_eq!(payload.len(), 8 + 24 + 1);
        assert_eq!(&payload[8..16], &101_010_101u64.to_le_bytes());
        assert_eq!(payload[32], 2);
        assert_eq!(decode_payload::<OpenPositionParams>(&payload), Some(params));
    }

    #[test]
    fn test_decode_payload_rejects_other_instruction() {
        let payload = SwapParams {
            amount_in: 1,
            min_amount_out: 1,
        }
        .to_payload();
        assert_eq!(decode_payload::<AddLiquidityParams>(&payload), None);
    }
}
