//! Launchpad provisioning service
//!
//! A small HTTP service in front of the Dynamic Bonding Curve program:
//!
//! - **Provisioning** creates a curve configuration and then a pool bound to
//!   it, signing both with the service wallet and reporting what the run
//!   cost.
//! - **Progress** reports how far a configuration's pool is toward
//!   migration.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]    | `ServerConfig`, command line and environment |
//! | [`provision`] | Two-phase config/pool orchestrator |
//! | [`progress`]  | Pool progress reader |
//! | [`signer`]    | Wallet credential providers |
//! | [`http`]      | axum router, JSON shapes, error statuses |
//! | [`logging`]   | `env_logger` setup |
//! | [`error`]     | Error enums and stable error kinds |

#![allow(clippy::arithmetic_side_effects)]

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod provision;
pub mod signer;

pub use {
    config::{Cluster, ServerConfig},
    error::{ErrorKind, ProgressError, ProvisionError},
    http::{router, AppState},
    progress::{PoolProgress, ProgressReader},
    provision::{PoolMetadata, ProvisionOutcome, ProvisionRequest, Provisioner},
};

use {
    launchpad_curve_client::{DbcProgram, LedgerClient, RpcLedgerClient},
    log::info,
    std::sync::Arc,
};

/// Wire the orchestrator and reader to one shared ledger client.
pub fn app_state(config: &ServerConfig, ledger: Arc<dyn LedgerClient>) -> AppState {
    let program = DbcProgram::new(ledger);
    AppState {
        provisioner: Arc::new(Provisioner::new(
            program.clone(),
            config.signer_provider(),
            config.curve.clone(),
            config.cluster.clone(),
        )),
        progress: Arc::new(ProgressReader::new(program)),
    }
}

/// [`app_state`] over a JSON-RPC connection to `config.rpc_url`.
pub fn rpc_app_state(config: &ServerConfig) -> AppState {
    let ledger = RpcLedgerClient::new(config.rpc_url.clone(), config.ledger.clone());
    info!("using rpc node {}", ledger.url());
    app_state(config, Arc::new(ledger))
}
