//! Swap instruction

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use spl_associated_token_account::get_associated_token_address;
use tracing::debug;

use super::{expect_mint, InstructionBuilder, Result, TransactionBuilderError};
use crate::program::args::{InstructionArgs, SwapParams};

/// Swap `amount_in` of `mint_in` for at least `min_amount_out` of `mint_out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub owner: Pubkey,
    pub amount_in: u64,
    pub min_amount_out: u64,
    pub mint_in: Pubkey,
    pub mint_out: Pubkey,
    /// Custody receiving `mint_in`
    pub custody_in: Pubkey,
    /// Custody dispensing `mint_out`
    pub custody_out: Pubkey,
}

impl InstructionBuilder {
    pub async fn build_swap(&self, req: &SwapRequest) -> Result<Instruction> {
        if req.mint_in == req.mint_out {
            return Err(TransactionBuilderError::instruction_failed(
                "swap",
                format!("input and output mint are both {}", req.mint_in),
            ));
        }

        let (receiving, dispensing) = futures::try_join!(
            self.fetch_custody(&req.custody_in),
            self.fetch_custody(&req.custody_out),
        )?;
        expect_mint("swap", &receiving, &req.mint_in)?;
        expect_mint("swap", &dispensing, &req.mint_out)?;
        if receiving.pool != dispensing.pool {
            return Err(TransactionBuilderError::instruction_failed(
                "swap",
                format!(
                    "custodies belong to different pools ({} / {})",
                    receiving.pool, dispensing.pool
                ),
            ));
        }

        let resolver = self.resolver();
        let accounts = vec![
            AccountMeta::new(req.owner, true),
            AccountMeta::new(get_associated_token_address(&req.owner, &req.mint_in), false),
            AccountMeta::new(get_associated_token_address(&req.owner, &req.mint_out), false),
            AccountMeta::new_readonly(resolver.transfer_authority(), false),
            AccountMeta::new_readonly(resolver.perpetuals(), false),
            AccountMeta::new(receiving.pool, false),
            AccountMeta::new(receiving.address, false),
            AccountMeta::new_readonly(receiving.oracle, false),
            AccountMeta::new(receiving.token_account, false),
            AccountMeta::new(dispensing.address, false),
            AccountMeta::new_readonly(dispensing.oracle, false),
            AccountMeta::new(dispensing.token_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ];

        let params = SwapParams {
            amount_in: req.amount_in,
            min_amount_out: req.min_amount_out,
        };
        debug!(
            owner = %req.owner,
            mint_in = %req.mint_in,
            mint_out = %req.mint_out,
            amount_in = req.amount_in,
            min_amount_out = req.min_amount_out,
            "Built swap instruction"
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts,
            data: params.to_payload(),
        })
    }
}
