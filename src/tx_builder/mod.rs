//! Instruction building for the perpetuals program
//!
//! One builder method per trading primitive. Each call resolves every address
//! it needs, fetches a fresh snapshot of the custodies involved and emits a
//! single validated [`Instruction`]:
//! - **swap**: token A → token B through two custodies
//! - **liquidity**: add/remove liquidity with the pool-wide auxiliary accounts
//! - **position**: open/close with a slippage-bounded price
//! - **compose**: multi-operation plans (swap-then-open) and ordering checks
//!
//! ## Snapshots
//!
//! Custody and pool state is never cached between calls: fees, oracle and
//! utilisation drift, so each build starts from a fresh read. Independent
//! reads inside one build run concurrently.

pub mod compose;
pub mod errors;
pub mod liquidity;
pub mod position;
pub mod slippage;
pub mod swap;

pub use compose::{compose, sanity_check_ix_order, Operation, OpenPositionWithSwapRequest};
pub use errors::TransactionBuilderError;
pub use liquidity::{pool_remaining_accounts, AddLiquidityRequest, RemoveLiquidityRequest};
pub use position::{ClosePositionRequest, OpenPositionRequest};
pub use slippage::SlippageTolerance;
pub use swap::SwapRequest;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::sync::Arc;
use tracing::debug;

use crate::address::AddressResolver;
use crate::program::{CustodyAccount, PoolAccount, ProgramContract};
use crate::transport::{Transport, TransportError};
use crate::types::{CustodySnapshot, PoolSnapshot};

pub type Result<T> = std::result::Result<T, TransactionBuilderError>;

/// Builds perpetuals program instructions from explicit inputs
#[derive(Clone)]
pub struct InstructionBuilder {
    transport: Arc<dyn Transport>,
    resolver: AddressResolver,
    slippage: SlippageTolerance,
}

impl InstructionBuilder {
    pub fn new(
        transport: Arc<dyn Transport>,
        contract: &ProgramContract,
        slippage: SlippageTolerance,
    ) -> Self {
        Self {
            transport,
            resolver: AddressResolver::new(contract.program_id),
            slippage,
        }
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    pub fn program_id(&self) -> Pubkey {
        *self.resolver.program_id()
    }

    pub fn slippage(&self) -> SlippageTolerance {
        self.slippage
    }

    /// Builds one operation into its instruction.
    pub async fn build(&self, operation: &Operation) -> Result<Instruction> {
        match operation {
            Operation::Swap(req) => self.build_swap(req).await,
            Operation::AddLiquidity(req) => self.build_add_liquidity(req).await,
            Operation::RemoveLiquidity(req) => self.build_remove_liquidity(req).await,
            Operation::OpenPosition(req) => self.build_open_position(req).await,
            Operation::ClosePosition(req) => self.build_close_position(req).await,
        }
    }

    /// Builds all operations concurrently; output order matches input order.
    pub async fn build_all(&self, operations: &[Operation]) -> Result<Vec<Instruction>> {
        futures::future::try_join_all(operations.iter().map(|op| self.build(op))).await
    }

    /// Fresh snapshot of a single custody.
    pub(crate) async fn fetch_custody(&self, address: &Pubkey) -> Result<CustodySnapshot> {
        let data = self
            .transport
            .fetch_account(address)
            .await?
            .ok_or_else(|| TransactionBuilderError::account_not_found("custody", *address))?;
        decode_custody(address, &data)
    }

    /// Fresh snapshots of several custodies in one round trip, in input order.
    pub(crate) async fn fetch_custodies(&self, addresses: &[Pubkey]) -> Result<Vec<CustodySnapshot>> {
        let accounts = self.transport.fetch_multiple_accounts(addresses).await?;
        if accounts.len() != addresses.len() {
            return Err(TransportError::Decode(format!(
                "requested {} custodies, got {}",
                addresses.len(),
                accounts.len()
            ))
            .into());
        }

        addresses
            .iter()
            .zip(accounts)
            .map(|(address, data)| {
                let data = data
                    .ok_or_else(|| TransactionBuilderError::account_not_found("custody", *address))?;
                decode_custody(address, &data)
            })
            .collect()
    }

    /// Pool with all of its custodies, in the pool's declared order.
    pub(crate) async fn fetch_pool(&self, pool: &Pubkey) -> Result<PoolSnapshot> {
        let data = self
            .transport
            .fetch_account(pool)
            .await?
            .ok_or_else(|| TransactionBuilderError::account_not_found("pool", *pool))?;
        let account =
            PoolAccount::decode(&data).map_err(|source| TransactionBuilderError::AccountDecode {
                what: "pool",
                address: *pool,
                source,
            })?;

        let custodies = self.fetch_custodies(&account.custodies).await?;
        debug!(
            pool = %pool,
            name = %account.name,
            custodies = custodies.len(),
            "Loaded pool snapshot"
        );

        Ok(PoolSnapshot {
            address: *pool,
            name: account.name,
            custodies,
        })
    }
}

fn decode_custody(address: &Pubkey, data: &[u8]) -> Result<CustodySnapshot> {
    let account =
        CustodyAccount::decode(data).map_err(|source| TransactionBuilderError::AccountDecode {
            what: "custody",
            address: *address,
            source,
        })?;
    Ok(CustodySnapshot::from_account(*address, &account))
}

/// Ensures a fetched custody actually holds the mint the caller named.
pub(crate) fn expect_mint(
    operation: &'static str,
    custody: &CustodySnapshot,
    mint: &Pubkey,
) -> Result<()> {
    if custody.mint != *mint {
        return Err(TransactionBuilderError::instruction_failed(
            operation,
            format!(
                "custody {} holds mint {}, expected {}",
                custody.address, custody.mint, mint
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Fixture, MockTransport};

    #[tokio::test]
    async fn test_fetch_custodies_keeps_order() {
        let fixture = Fixture::with_mints(3);
        let builder = fixture.builder();
        let addresses: Vec<Pubkey> = fixture.custodies.iter().rev().map(|c| c.address).collect();

        let snapshots = builder.fetch_custodies(&addresses).await.unwrap();
        let got: Vec<Pubkey> = snapshots.iter().map(|c| c.address).collect();
        assert_eq!(got, addresses);
    }

    #[tokio::test]
    async fn test_missing_custody_is_account_not_found() {
        let transport = Arc::new(MockTransport::new());
        let builder = InstructionBuilder::new(
            transport,
            &ProgramContract::perpetuals(Pubkey::new_unique()),
            SlippageTolerance::default(),
        );
        let address = Pubkey::new_unique();

        let err = builder.fetch_custody(&address).await.unwrap_err();
        assert!(matches!(
            err,
            TransactionBuilderError::AccountNotFound { what: "custody", .. }
        ));
    }

    #[tokio::test]
    async fn test_pool_snapshot_follows_declared_order() {
        let fixture = Fixture::with_mints(4);
        let pool = fixture.builder().fetch_pool(&fixture.pool).await.unwrap();
        let got: Vec<Pubkey> = pool.custodies.iter().map(|c| c.address).collect();
        let expected: Vec<Pubkey> = fixture.custodies.iter().map(|c| c.address).collect();
        assert_eq!(got, expected);
        assert_eq!(pool.name, "main");
    }
}
