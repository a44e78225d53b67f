//! Program addresses, PDA seeds and protocol constants of the Dynamic Bonding
//! Curve program.

use solana_pubkey::{pubkey, Pubkey};

/// Dynamic Bonding Curve program (same address on devnet and mainnet).
pub const DBC_PROGRAM_ID: Pubkey = pubkey!("dbcij3LWUppWqq96dh6gJWwBifmcGfLSB5D4DuSMaqN");

/// Wrapped SOL, the quote mint of every pool this service creates.
pub const NATIVE_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// Metaplex token metadata program, only used by SPL Token pools.
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Seeds used to derive the program's PDAs.
pub mod seeds {
    pub const POOL_AUTHORITY: &[u8] = b"pool_authority";
    pub const POOL: &[u8] = b"pool";
    pub const TOKEN_VAULT: &[u8] = b"token_vault";
    pub const EVENT_AUTHORITY: &[u8] = b"__event_authority";
    pub const METADATA: &[u8] = b"metadata";
}

/// Fee numerators are expressed over this denominator.
pub const FEE_DENOMINATOR: u64 = 1_000_000_000;

pub const MAX_BASIS_POINT: u64 = 10_000;

/// Highest base fee the program accepts (99%).
pub const MAX_FEE_BPS: u16 = 9_900;

pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;
pub const MAX_SQRT_PRICE: u128 = 79_226_673_521_066_979_257_578_248_091;

/// Dynamic fee defaults mirrored from the program's reference SDK.
pub mod dynamic_fee {
    pub const BIN_STEP_BPS: u16 = 1;
    pub const BIN_STEP_BPS_U128: u128 = 1_844_674_407_370_955;
    pub const FILTER_PERIOD: u16 = 10;
    pub const DECAY_PERIOD: u16 = 120;
    pub const REDUCTION_FACTOR: u16 = 5_000;
    pub const MAX_PRICE_CHANGE_BPS: u64 = 1_500;
    /// The dynamic component may add at most this share of the base fee.
    pub const MAX_DYNAMIC_FEE_PERCENT: u64 = 20;
    pub const SCALING_FACTOR: u128 = 100_000_000_000;
}
