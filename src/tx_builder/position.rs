//! Open/close position instructions

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_system_interface::program as system_program;
use spl_associated_token_account::get_associated_token_address;
use tracing::debug;

use super::{expect_mint, InstructionBuilder, Result};
use crate::program::args::{ClosePositionParams, InstructionArgs, OpenPositionParams};
use crate::types::Side;

/// Open a position on `custody`, funded with `collateral` of `mint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPositionRequest {
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub custody: Pubkey,
    /// Quoted entry price; the submitted cap is derived from it
    pub price: u64,
    pub collateral: u64,
    pub size: u64,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosePositionRequest {
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub custody: Pubkey,
    /// Quoted exit price; the submitted bound is derived from it
    pub price: u64,
    pub side: Side,
}

impl InstructionBuilder {
    pub async fn build_open_position(&self, req: &OpenPositionRequest) -> Result<Instruction> {
        let price = self.slippage().open_price(req.price)?;
        let custody = self.fetch_custody(&req.custody).await?;
        expect_mint("open_position", &custody, &req.mint)?;

        let resolver = self.resolver();
        let position = resolver.position(&req.owner, &custody.pool, &custody.address, req.side);
        let accounts = vec![
            AccountMeta::new(req.owner, true),
            AccountMeta::new(get_associated_token_address(&req.owner, &req.mint), false),
            AccountMeta::new_readonly(resolver.perpetuals(), false),
            AccountMeta::new(custody.pool, false),
            AccountMeta::new(position, false),
            AccountMeta::new(custody.address, false),
            AccountMeta::new_readonly(custody.oracle, false),
            // collateral custody: the position's own custody
            AccountMeta::new(custody.address, false),
            AccountMeta::new_readonly(custody.oracle, false),
            AccountMeta::new(custody.token_account, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ];

        let params = OpenPositionParams {
            price,
            collateral: req.collateral,
            size: req.size,
            side: req.side,
        };
        debug!(
            owner = %req.owner,
            mint = %req.mint,
            side = %req.side,
            quoted_price = req.price,
            submitted_price = price,
            collateral = req.collateral,
            size = req.size,
            position = %position,
            "Built open_position instruction"
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts,
            data: params.to_payload(),
        })
    }

    pub async fn build_close_position(&self, req: &ClosePositionRequest) -> Result<Instruction> {
        let price = self.slippage().close_price(req.price, req.side)?;
        let custody = self.fetch_custody(&req.custody).await?;
        expect_mint("close_position", &custody, &req.mint)?;

        let resolver = self.resolver();
        let position = resolver.position(&req.owner, &custody.pool, &custody.address, req.side);
        let accounts = vec![
            AccountMeta::new(req.owner, true),
            AccountMeta::new(get_associated_token_address(&req.owner, &req.mint), false),
            AccountMeta::new_readonly(resolver.transfer_authority(), false),
            AccountMeta::new_readonly(resolver.perpetuals(), false),
            AccountMeta::new(custody.pool, false),
            AccountMeta::new(position, false),
            AccountMeta::new(custody.address, false),
            AccountMeta::new_readonly(custody.oracle, false),
            AccountMeta::new(custody.address, false),
            AccountMeta::new_readonly(custody.oracle, false),
            AccountMeta::new(custody.token_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ];

        debug!(
            owner = %req.owner,
            side = %req.side,
            quoted_price = req.price,
            submitted_price = price,
            position = %position,
            "Built close_position instruction"
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts,
            data: ClosePositionParams { price }.to_payload(),
        })
    }
}
