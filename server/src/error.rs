//! Error types for the provisioning and progress endpoints.
//!
//! Every error reports a stable [`ErrorKind`]; provisioning errors that
//! happen after a transaction landed also carry the addresses and
//! signatures obtained so far.

use {
    crate::{provision::ProvisionState, signer::CredentialError},
    launchpad_curve_client::CurveClientError,
    solana_pubkey::Pubkey,
    solana_signature::Signature,
    std::{error::Error as StdError, fmt},
    thiserror::Error,
};

/// Machine-readable error classification exposed to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    LedgerSubmission,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::Configuration => "configuration_error",
            Self::LedgerSubmission => "ledger_submission_error",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whatever a failed provisioning run had already put on the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialProvision {
    pub config_address: Option<Pubkey>,
    pub config_signature: Option<Signature>,
    pub pool_address: Option<Pubkey>,
    pub base_mint: Option<Pubkey>,
    pub pool_signature: Option<Signature>,
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("failed to read the signer balance")]
    BalanceUnavailable(#[source] CurveClientError),

    #[error("config {config_address} was not created")]
    ConfigFailed {
        config_address: Pubkey,
        #[source]
        source: CurveClientError,
    },

    #[error("config {config_address} was created but pool {pool_address} was not")]
    PoolFailed {
        config_address: Pubkey,
        config_signature: Signature,
        pool_address: Pubkey,
        base_mint: Pubkey,
        /// Set when the pool transaction was sent, so it may still land.
        pool_signature: Option<Signature>,
        #[source]
        source: CurveClientError,
    },

    #[error("pool {pool_address} was created but the final balance could not be read")]
    AccountingFailed {
        config_address: Pubkey,
        config_signature: Signature,
        pool_address: Pubkey,
        base_mint: Pubkey,
        pool_signature: Signature,
        #[source]
        source: CurveClientError,
    },

    #[error("unrecognized cluster {cluster:?}, expected devnet or mainnet")]
    Reporting {
        cluster: String,
        config_address: Pubkey,
        config_signature: Signature,
        pool_address: Pubkey,
        base_mint: Pubkey,
        pool_signature: Signature,
    },
}

impl ProvisionError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Credentials(_) | Self::Reporting { .. } => ErrorKind::Configuration,
            Self::BalanceUnavailable(_)
            | Self::ConfigFailed { .. }
            | Self::PoolFailed { .. }
            | Self::AccountingFailed { .. } => ErrorKind::LedgerSubmission,
        }
    }

    /// Whether the failure was detected before anything touched the ledger.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Credentials(_))
    }

    /// Orchestrator state the run ended in; `None` for precondition failures.
    pub fn state(&self) -> Option<ProvisionState> {
        match self {
            Self::Validation(_) | Self::Credentials(_) => None,
            Self::BalanceUnavailable(_) => Some(ProvisionState::Start),
            Self::ConfigFailed { .. } => Some(ProvisionState::ConfigFailed),
            Self::PoolFailed { .. } => Some(ProvisionState::ConfigCreatedPoolMissing),
            Self::AccountingFailed { .. } => Some(ProvisionState::AccountingFailed),
            Self::Reporting { .. } => Some(ProvisionState::ReportingFailed),
        }
    }

    pub fn partial(&self) -> PartialProvision {
        match self {
            Self::Validation(_) | Self::Credentials(_) | Self::BalanceUnavailable(_) => {
                PartialProvision::default()
            }
            Self::ConfigFailed { config_address, .. } => PartialProvision {
                config_address: Some(*config_address),
                ..PartialProvision::default()
            },
            Self::PoolFailed {
                config_address,
                config_signature,
                pool_address,
                base_mint,
                pool_signature,
                ..
            } => PartialProvision {
                config_address: Some(*config_address),
                config_signature: Some(*config_signature),
                pool_address: Some(*pool_address),
                base_mint: Some(*base_mint),
                pool_signature: *pool_signature,
            },
            Self::AccountingFailed {
                config_address,
                config_signature,
                pool_address,
                base_mint,
                pool_signature,
                ..
            }
            | Self::Reporting {
                config_address,
                config_signature,
                pool_address,
                base_mint,
                pool_signature,
                ..
            } => PartialProvision {
                config_address: Some(*config_address),
                config_signature: Some(*config_signature),
                pool_address: Some(*pool_address),
                base_mint: Some(*base_mint),
                pool_signature: Some(*pool_signature),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("{0}")]
    Validation(String),

    #[error("no pool found for config {0}")]
    NotFound(Pubkey),

    #[error("failed to read pool progress")]
    Ledger(#[from] CurveClientError),
}

impl ProgressError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Ledger(_) => ErrorKind::LedgerSubmission,
        }
    }
}

/// The error message followed by every source, joined with `": "`.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_strings() {
        assert_eq!(ErrorKind::Validation.as_str(), "validation_error");
        assert_eq!(ErrorKind::Configuration.as_str(), "configuration_error");
        assert_eq!(ErrorKind::LedgerSubmission.as_str(), "ledger_submission_error");
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
    }

    #[test]
    fn chain_includes_sources() {
        let err = ProvisionError::ConfigFailed {
            config_address: Pubkey::new_unique(),
            source: CurveClientError::invalid_parameter("boom"),
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with("config "));
        assert!(chain.ends_with(": invalid parameter: boom"));
    }

    #[test]
    fn pool_failure_keeps_config_details() {
        let config_address = Pubkey::new_unique();
        let config_signature = Signature::from([3u8; 64]);
        let pool_address = Pubkey::new_unique();
        let base_mint = Pubkey::new_unique();
        let err = ProvisionError::PoolFailed {
            config_address,
            config_signature,
            pool_address,
            base_mint,
            pool_signature: None,
            source: CurveClientError::invalid_parameter("boom"),
        };
        assert_eq!(err.kind(), ErrorKind::LedgerSubmission);
        assert_eq!(err.state(), Some(ProvisionState::ConfigCreatedPoolMissing));
        assert_eq!(
            err.partial(),
            PartialProvision {
                config_address: Some(config_address),
                config_signature: Some(config_signature),
                pool_address: Some(pool_address),
                base_mint: Some(base_mint),
                pool_signature: None,
            }
        );
    }

    #[test]
    fn credentials_are_configuration_errors() {
        let err = ProvisionError::from(CredentialError::Missing);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.is_precondition());
        assert_eq!(err.state(), None);
    }
}
