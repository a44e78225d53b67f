//! Launchpad curve client
//!
//! Everything the launchpad service needs to talk to the Meteora Dynamic
//! Bonding Curve program on Solana:
//!
//! - **Ledger adapter**: a small async trait over the JSON-RPC node
//!   (balance, blockhash, submit + confirm, account and program scans) with
//!   an `RpcClient`-backed implementation.
//! - **Curve parameter builder**: derives the full `create_config` payload
//!   from total supply, migration share and migration threshold.
//! - **Program client**: instruction builders, PDA derivation, account
//!   decoding and the pools-by-config / curve-progress queries.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`builder`]   | `CurveDefaults`, threshold parsing, `build_curve` |
//! | [`params`]    | Borsh instruction payloads |
//! | [`program`]   | Instructions, PDAs, account layouts, `DbcProgram` queries |
//! | [`ledger`]    | `LedgerClient` trait and `RpcLedgerClient` |
//! | [`constants`] | Program ids, seeds, protocol limits |
//! | [`error`]     | Crate-wide error enum |

#![allow(clippy::arithmetic_side_effects)]

pub mod builder;
pub mod constants;
pub mod error;
#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod fake;
pub mod ledger;
pub mod params;
pub mod program;

#[cfg(test)]
mod tests;

pub use {
    builder::{build_curve, parse_quote_threshold, CurveDefaults, TokenType},
    error::{CurveClientError, Result},
    ledger::{LedgerClient, RpcLedgerClient, RpcLedgerConfig, SubmitOptions},
    params::ConfigParameters,
    program::DbcProgram,
};
