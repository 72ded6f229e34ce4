//! Derived-address seed prefixes of the perpetuals program.

/// Global program configuration
pub const PERPETUALS_SEED: &[u8] = b"perpetuals";
/// Authority that moves tokens out of custody vaults
pub const TRANSFER_AUTHORITY_SEED: &[u8] = b"transfer_authority";
/// Pool PDA seed (followed by the pool name)
pub const POOL_SEED: &[u8] = b"pool";
/// LP token mint seed (followed by the pool address)
pub const LP_TOKEN_MINT_SEED: &[u8] = b"lp_token_mint";
/// Custody PDA seed (followed by pool and mint)
pub const CUSTODY_SEED: &[u8] = b"custody";
/// Custody vault seed (followed by pool and mint)
pub const CUSTODY_TOKEN_ACCOUNT_SEED: &[u8] = b"custody_token_account";
/// Position PDA seed (followed by owner, pool, custody, side tag)
pub const POSITION_SEED: &[u8] = b"position";
