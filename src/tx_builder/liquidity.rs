//! Add/remove liquidity instructions
//!
//! The program values the whole pool by walking a positional tail of
//! accounts: every custody in the pool's declared order, then every custody
//! oracle in the same order. A reordered tail is not rejected on-chain, it is
//! silently mis-valued, so both halves are only ever produced together by
//! [`pool_remaining_accounts`] from one ordered custody list.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use spl_associated_token_account::get_associated_token_address;
use tracing::debug;

use super::{InstructionBuilder, Result, TransactionBuilderError};
use crate::program::args::{AddLiquidityParams, InstructionArgs, RemoveLiquidityParams};
use crate::types::{CustodySnapshot, PoolSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityRequest {
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub amount_in: u64,
    /// Minimum LP tokens to accept; 0 accepts any amount
    pub min_lp_amount_out: u64,
    pub pool: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityRequest {
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub lp_amount_in: u64,
    pub min_amount_out: u64,
    pub pool: Pubkey,
}

/// Auxiliary accounts for pool-wide valuation:
/// `[custody_0..custody_n, oracle_0..oracle_n]`, both in pool order.
pub fn pool_remaining_accounts(pool: &PoolSnapshot) -> Vec<AccountMeta> {
    let custodies = &pool.custodies;
    custodies
        .iter()
        .map(|c| AccountMeta::new_readonly(c.address, false))
        .chain(
            custodies
                .iter()
                .map(|c| AccountMeta::new_readonly(c.oracle, false)),
        )
        .collect()
}

/// Accounts shared by add and remove: everything after the owner's token
/// account for the custody mint.
fn liquidity_core_accounts(
    builder: &InstructionBuilder,
    owner: &Pubkey,
    pool: &Pubkey,
    custody: &CustodySnapshot,
) -> Vec<AccountMeta> {
    let resolver = builder.resolver();
    let lp_token_mint = resolver.lp_token_mint(pool);
    vec![
        AccountMeta::new(get_associated_token_address(owner, &lp_token_mint), false),
        AccountMeta::new_readonly(resolver.transfer_authority(), false),
        AccountMeta::new_readonly(resolver.perpetuals(), false),
        AccountMeta::new(*pool, false),
        AccountMeta::new(custody.address, false),
        AccountMeta::new_readonly(custody.oracle, false),
        AccountMeta::new(custody.token_account, false),
        AccountMeta::new(lp_token_mint, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ]
}

fn locate_custody<'a>(pool: &'a PoolSnapshot, mint: &Pubkey) -> Result<&'a CustodySnapshot> {
    pool.custody_for_mint(mint)
        .ok_or(TransactionBuilderError::CustodyNotInPool {
            mint: *mint,
            pool: pool.address,
        })
}

impl InstructionBuilder {
    pub async fn build_add_liquidity(&self, req: &AddLiquidityRequest) -> Result<Instruction> {
        let pool = self.fetch_pool(&req.pool).await?;
        let custody = locate_custody(&pool, &req.mint)?;

        let mut accounts = Vec::with_capacity(11 + 2 * pool.custodies.len());
        accounts.push(AccountMeta::new(req.owner, true));
        accounts.push(AccountMeta::new(
            get_associated_token_address(&req.owner, &req.mint),
            false,
        ));
        accounts.extend(liquidity_core_accounts(self, &req.owner, &req.pool, custody));
        accounts.extend(pool_remaining_accounts(&pool));

        let params = AddLiquidityParams {
            amount_in: req.amount_in,
            min_lp_amount_out: req.min_lp_amount_out,
        };
        debug!(
            owner = %req.owner,
            mint = %req.mint,
            pool = %req.pool,
            amount_in = req.amount_in,
            custodies = pool.custodies.len(),
            "Built add_liquidity instruction"
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts,
            data: params.to_payload(),
        })
    }

    pub async fn build_remove_liquidity(&self, req: &RemoveLiquidityRequest) -> Result<Instruction> {
        let pool = self.fetch_pool(&req.pool).await?;
        let custody = locate_custody(&pool, &req.mint)?;

        let mut accounts = Vec::with_capacity(11 + 2 * pool.custodies.len());
        accounts.push(AccountMeta::new(req.owner, true));
        accounts.push(AccountMeta::new(
            get_associated_token_address(&req.owner, &req.mint),
            false,
        ));
        accounts.extend(liquidity_core_accounts(self, &req.owner, &req.pool, custody));
        accounts.extend(pool_remaining_accounts(&pool));

        let params = RemoveLiquidityParams {
            lp_amount_in: req.lp_amount_in,
            min_amount_out: req.min_amount_out,
        };
        debug!(
            owner = %req.owner,
            mint = %req.mint,
            pool = %req.pool,
            lp_amount_in = req.lp_amount_in,
            "Built remove_liquidity instruction"
        );

        Ok(Instruction {
            program_id: self.program_id(),
            accounts,
            data: params.to_payload(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::args::decode_payload;
    use crate::test_utils::Fixture;

    /// Number of fixed accounts before the auxiliary tail
    const CORE_ACCOUNTS: usize = 11;

    #[tokio::test]
    async fn test_add_liquidity_tail_is_pool_ordered() {
        let fixture = Fixture::with_mints(3);
        let target = &fixture.custodies[1];
        let req = AddLiquidityRequest {
            owner: fixture.owner,
            mint: target.mint,
            amount_in: 5_000,
            min_lp_amount_out: 0,
            pool: fixture.pool,
        };

        let ix = fixture.builder().build_add_liquidity(&req).await.unwrap();
        let tail: Vec<Pubkey> = ix.accounts[CORE_ACCOUNTS..]
            .iter()
            .map(|m| m.pubkey)
            .collect();

        let expected: Vec<Pubkey> = fixture
            .custodies
            .iter()
            .map(|c| c.address)
            .chain(fixture.custodies.iter().map(|c| c.oracle))
            .collect();
        assert_eq!(tail.len(), 2 * fixture.custodies.len());
        assert_eq!(tail, expected);
        assert!(ix.accounts[CORE_ACCOUNTS..]
            .iter()
            .all(|m| !m.is_writable && !m.is_signer));

        // target custody sits in the core accounts, not at the front of the tail
        assert_eq!(ix.accounts[6].pubkey, target.address);
        assert_eq!(ix.accounts[7].pubkey, target.oracle);

        let params: AddLiquidityParams = decode_payload(&ix.data).unwrap();
        assert_eq!(params.amount_in, 5_000);
    }

    #[tokio::test]
    async fn test_remove_liquidity_uses_same_tail() {
        let fixture = Fixture::with_mints(3);
        let target = &fixture.custodies[2];
        let builder = fixture.builder();

        let add = builder
            .build_add_liquidity(&AddLiquidityRequest {
                owner: fixture.owner,
                mint: target.mint,
                amount_in: 1,
                min_lp_amount_out: 0,
                pool: fixture.pool,
            })
            .await
            .unwrap();
        let remove = builder
            .build_remove_liquidity(&RemoveLiquidityRequest {
                owner: fixture.owner,
                mint: target.mint,
                lp_amount_in: 1,
                min_amount_out: 0,
                pool: fixture.pool,
            })
            .await
            .unwrap();

        assert_eq!(
            add.accounts[CORE_ACCOUNTS..],
            remove.accounts[CORE_ACCOUNTS..]
        );
        assert_ne!(add.data, remove.data);
    }

    #[tokio::test]
    async fn test_add_liquidity_unknown_mint() {
        let fixture = Fixture::with_mints(2);
        let req = AddLiquidityRequest {
            owner: fixture.owner,
            mint: Pubkey::new_unique(),
            amount_in: 1,
            min_lp_amount_out: 0,
            pool: fixture.pool,
        };

        let err = fixture.builder().build_add_liquidity(&req).await.unwrap_err();
        assert!(matches!(err, TransactionBuilderError::CustodyNotInPool { .. }));
    }

    #[test]
    fn test_remaining_accounts_shape() {
        let custodies: Vec<CustodySnapshot> = (0..3)
            .map(|i| CustodySnapshot {
                address: Pubkey::new_unique(),
                pool: Pubkey::default(),
                mint: Pubkey::new_unique(),
                token_account: Pubkey::new_unique(),
                oracle: Pubkey::new_unique(),
                decimals: 6 + i,
            })
            .collect();
        let pool = PoolSnapshot {
            address: Pubkey::new_unique(),
            name: "main".to_string(),
            custodies: custodies.clone(),
        };

        let metas = pool_remaining_accounts(&pool);
        assert_eq!(metas.len(), 6);
        for (i, c) in custodies.iter().enumerate() {
            assert_eq!(metas[i].pubkey, c.address);
            assert_eq!(metas[i + 3].pubkey, c.oracle);
        }
    }
}
