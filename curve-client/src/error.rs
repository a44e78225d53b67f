//! Error types for the ledger adapter and the curve program client.

use {
    solana_pubkey::Pubkey, solana_rpc_client_api::client_error::Error as ClientError,
    solana_signature::Signature, solana_signer::SignerError, thiserror::Error,
};

/// Errors that can occur while talking to the ledger or building curve payloads.
#[derive(Error, Debug)]
pub enum CurveClientError {
    /// The RPC node rejected or failed a request.
    #[error("rpc error: {0}")]
    Rpc(Box<ClientError>),

    /// A transaction could not be signed by the supplied keypairs.
    #[error("signing error: {0}")]
    Signer(#[from] SignerError),

    /// The transaction landed but its execution failed.
    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed {
        /// Signature of the failed transaction.
        signature: Signature,
        /// Ledger-reported failure.
        reason: String,
    },

    /// The blockhash expired before the transaction reached the requested commitment.
    #[error("transaction {0} was not confirmed before its blockhash expired")]
    BlockhashExpired(Signature),

    /// Confirmation polling gave up.
    #[error("transaction {signature} not confirmed after {elapsed_ms}ms")]
    ConfirmationTimeout {
        /// Signature being polled.
        signature: Signature,
        /// Time spent polling.
        elapsed_ms: u64,
    },

    /// The requested account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    /// The account exists but does not decode as the expected type.
    #[error("invalid account data for {address}: {reason}")]
    InvalidAccountData {
        /// Account that failed to decode.
        address: Pubkey,
        /// What was wrong with it.
        reason: String,
    },

    /// A curve or instruction parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Borsh serialization of an instruction payload failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] std::io::Error),
}

impl From<ClientError> for CurveClientError {
    fn from(err: ClientError) -> Self {
        Self::Rpc(Box::new(err))
    }
}

impl CurveClientError {
    /// Shorthand for [`CurveClientError::InvalidParameter`].
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }

    /// Signature of the transaction this error is about, if it was sent.
    pub fn signature(&self) -> Option<Signature> {
        match self {
            Self::TransactionFailed { signature, .. }
            | Self::BlockhashExpired(signature)
            | Self::ConfirmationTimeout { signature, .. } => Some(*signature),
            _ => None,
        }
    }
}

/// Convenience result type for curve client operations.
pub type Result<T> = std::result::Result<T, CurveClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sent_transactions_report_their_signature() {
        let signature = Signature::from([7u8; 64]);
        let sent = [
            CurveClientError::TransactionFailed {
                signature,
                reason: "custom program error: 0x1".to_string(),
            },
            CurveClientError::BlockhashExpired(signature),
            CurveClientError::ConfirmationTimeout {
                signature,
                elapsed_ms: 90_000,
            },
        ];
        for err in &sent {
            assert_eq!(err.signature(), Some(signature), "{err}");
        }
        assert_eq!(CurveClientError::invalid_parameter("x").signature(), None);
        assert_eq!(
            CurveClientError::AccountNotFound(Pubkey::new_unique()).signature(),
            None
        );
    }
}
