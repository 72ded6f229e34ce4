//! Multi-operation composition
//!
//! Composition is plain concatenation of already built instructions. Anything
//! conditional (such as skipping a swap when the funding token already is the
//! position token) happens while planning the [`Operation`] list, before any
//! instruction exists.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::debug;

use super::{
    AddLiquidityRequest, ClosePositionRequest, InstructionBuilder, OpenPositionRequest,
    RemoveLiquidityRequest, Result, SwapRequest, TransactionBuilderError,
};
use crate::program::args::{decode_payload, OpenPositionParams, SwapParams};
use crate::types::Side;

/// One trading primitive, ready to be built into an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Swap(SwapRequest),
    AddLiquidity(AddLiquidityRequest),
    RemoveLiquidity(RemoveLiquidityRequest),
    OpenPosition(OpenPositionRequest),
    ClosePosition(ClosePositionRequest),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Swap(_) => "swap",
            Self::AddLiquidity(_) => "add_liquidity",
            Self::RemoveLiquidity(_) => "remove_liquidity",
            Self::OpenPosition(_) => "open_position",
            Self::ClosePosition(_) => "close_position",
        }
    }
}

/// Open a position on `custody_out`, funded by swapping `amount_in` of
/// `mint_in` first when the two mints differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPositionWithSwapRequest {
    pub owner: Pubkey,
    pub mint_in: Pubkey,
    pub mint_out: Pubkey,
    pub custody_in: Pubkey,
    pub custody_out: Pubkey,
    pub price: u64,
    pub amount_in: u64,
    pub collateral: u64,
    pub size: u64,
    pub side: Side,
}

impl OpenPositionWithSwapRequest {
    /// Ordered operations for this request: `[swap, open]`, or `[open]` when
    /// no conversion is needed.
    ///
    /// The swap's minimum output is pinned to `collateral` so the open never
    /// runs on less collateral than it was sized for.
    pub fn plan(&self) -> Vec<Operation> {
        let swap = Operation::Swap(SwapRequest {
            owner: self.owner,
            amount_in: self.amount_in,
            min_amount_out: self.collateral,
            mint_in: self.mint_in,
            mint_out: self.mint_out,
            custody_in: self.custody_in,
            custody_out: self.custody_out,
        });
        let open = Operation::OpenPosition(OpenPositionRequest {
            owner: self.owner,
            mint: self.mint_out,
            custody: self.custody_out,
            price: self.price,
            collateral: self.collateral,
            size: self.size,
            side: self.side,
        });

        [swap, open]
            .into_iter()
            .filter(|op| !matches!(op, Operation::Swap(s) if s.mint_in == s.mint_out))
            .collect()
    }
}

/// Concatenates per-operation instruction groups in order.
pub fn compose<I>(parts: I) -> Vec<Instruction>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = Instruction>,
{
    parts.into_iter().flatten().collect()
}

impl InstructionBuilder {
    /// Builds `[swap, open]` (or `[open]` for a same-mint request) for one
    /// atomic transaction. Both instructions are built concurrently.
    pub async fn build_open_position_with_swap(
        &self,
        req: &OpenPositionWithSwapRequest,
    ) -> Result<Vec<Instruction>> {
        let plan = req.plan();
        let instructions = compose(self.build_all(&plan).await?.into_iter().map(|ix| [ix]));
        sanity_check_ix_order(&instructions, &self.program_id())?;

        debug!(
            owner = %req.owner,
            mint_in = %req.mint_in,
            mint_out = %req.mint_out,
            swapped = plan.len() > 1,
            instructions = instructions.len(),
            "Composed open_position_with_swap"
        );
        Ok(instructions)
    }
}

/// Validates ordering of a composed list (debug builds only).
///
/// Rules:
/// - the list is not empty
/// - every program swap comes before the first program open_position
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(
    instructions: &[Instruction],
    program_id: &Pubkey,
) -> Result<()> {
    if instructions.is_empty() {
        return Err(TransactionBuilderError::compile("instruction list is empty"));
    }

    let is_open = |ix: &Instruction| {
        ix.program_id == *program_id && decode_payload::<OpenPositionParams>(&ix.data).is_some()
    };
    let is_swap = |ix: &Instruction| {
        ix.program_id == *program_id && decode_payload::<SwapParams>(&ix.data).is_some()
    };

    if let Some(open_idx) = instructions.iter().position(|ix| is_open(ix)) {
        let late_swap = instructions
            .iter()
            .enumerate()
            .skip(open_idx + 1)
            .find(|(_, ix)| is_swap(ix));
        if let Some((idx, _)) = late_swap {
            return Err(TransactionBuilderError::compile(format!(
                "swap at position {} follows open_position at position {}",
                idx, open_idx
            )));
        }
    }

    Ok(())
}

#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(
    _instructions: &[Instruction],
    _program_id: &Pubkey,
) -> Result<()> {
    Ok(())
}
