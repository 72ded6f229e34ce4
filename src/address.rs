//! Program-derived address resolution
//!
//! Pure functions of `(seeds, program id)`. Nothing here is cached; callers
//! recompute addresses whenever they need them.

use solana_sdk::pubkey::Pubkey;

use crate::program::seeds::{
    CUSTODY_SEED, CUSTODY_TOKEN_ACCOUNT_SEED, LP_TOKEN_MINT_SEED, PERPETUALS_SEED, POOL_SEED,
    POSITION_SEED, TRANSFER_AUTHORITY_SEED,
};
use crate::types::Side;

/// Derives program-owned addresses for one program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressResolver {
    program_id: Pubkey,
}

/// Standard derived-address search (hash with a descending bump until the
/// result is off the ed25519 curve).
///
/// Panics only on malformed input (more than 16 seeds or a seed longer than
/// 32 bytes), which is a caller bug rather than a runtime condition.
pub fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(seeds, program_id).0
}

impl AddressResolver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn derive(&self, seeds: &[&[u8]]) -> Pubkey {
        derive(seeds, &self.program_id)
    }

    pub fn perpetuals(&self) -> Pubkey {
        self.derive(&[PERPETUALS_SEED])
    }

    pub fn transfer_authority(&self) -> Pubkey {
        self.derive(&[TRANSFER_AUTHORITY_SEED])
    }

    pub fn pool(&self, name: &str) -> Pubkey {
        self.derive(&[POOL_SEED, name.as_bytes()])
    }

    pub fn lp_token_mint(&self, pool: &Pubkey) -> Pubkey {
        self.derive(&[LP_TOKEN_MINT_SEED, pool.as_ref()])
    }

    pub fn custody(&self, pool: &Pubkey, mint: &Pubkey) -> Pubkey {
        self.derive(&[CUSTODY_SEED, pool.as_ref(), mint.as_ref()])
    }

    pub fn custody_token_account(&self, pool: &Pubkey, mint: &Pubkey) -> Pubkey {
        self.derive(&[CUSTODY_TOKEN_ACCOUNT_SEED, pool.as_ref(), mint.as_ref()])
    }

    /// One address per side, so an owner can hold a long and a short on the
    /// same custody at once.
    pub fn position(&self, owner: &Pubkey, pool: &Pubkey, custody: &Pubkey, side: Side) -> Pubkey {
        self.derive(&[
            POSITION_SEED,
            owner.as_ref(),
            pool.as_ref(),
            custody.as_ref(),
            &[side.seed_tag()],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let program = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let resolver = AddressResolver::new(program);

        assert_eq!(resolver.custody(&pool, &mint), resolver.custody(&pool, &mint));
        assert_eq!(
            resolver.custody(&pool, &mint),
            derive(&[b"custody", pool.as_ref(), mint.as_ref()], &program)
        );
    }

    #[test]
    fn test_derived_addresses_are_off_curve() {
        let resolver = AddressResolver::new(Pubkey::new_unique());
        let pool = resolver.pool("main");
        assert!(!pool.is_on_curve());
        assert!(!resolver.transfer_authority().is_on_curve());
    }

    #[test]
    fn test_position_sides_are_disjoint() {
        let resolver = AddressResolver::new(Pubkey::new_unique());
        let owner = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let custody = Pubkey::new_unique();

        let long = resolver.position(&owner, &pool, &custody, Side::Long);
        let short = resolver.position(&owner, &pool, &custody, Side::Short);
        assert_ne!(long, short);
    }

    #[test]
    fn test_custody_and_vault_differ() {
        let resolver = AddressResolver::new(Pubkey::new_unique());
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_ne!(
            resolver.custody(&pool, &mint),
            resolver.custody_token_account(&pool, &mint)
        );
    }

    #[test]
    fn test_program_id_scopes_addresses() {
        let pool = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let a = AddressResolver::new(Pubkey::new_unique());
        let b = AddressResolver::new(Pubkey::new_unique());
        assert_ne!(a.custody(&pool, &mint), b.custody(&pool, &mint));
    }
}
