//! Ledger client adapter.
//!
//! [`LedgerClient`] is the narrow surface the rest of the service needs from a
//! Solana node. [`RpcLedgerClient`] implements it over the nonblocking
//! [`RpcClient`]; tests substitute the in-memory fake from
//! [`crate::fake`].

use {
    crate::error::{CurveClientError, Result},
    async_trait::async_trait,
    log::{debug, warn},
    solana_account_decoder_client_types::UiAccountEncoding,
    solana_commitment_config::CommitmentConfig,
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    solana_rpc_client::nonblocking::rpc_client::RpcClient,
    solana_rpc_client_api::{
        config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig},
        filter::{Memcmp, RpcFilterType},
    },
    solana_signature::Signature,
    solana_transaction::Transaction,
    std::time::{Duration, Instant},
};

/// How a transaction is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Skip the node's pre-flight simulation.
    pub skip_preflight: bool,
    /// Rebroadcast attempts performed by the node itself.
    pub max_retries: Option<usize>,
}

impl SubmitOptions {
    /// Simulated before broadcast, with the node retrying up to `max_retries` times.
    pub fn simulated(max_retries: usize) -> Self {
        Self {
            skip_preflight: false,
            max_retries: Some(max_retries),
        }
    }

    /// Broadcast without simulation.
    pub fn unsimulated() -> Self {
        Self {
            skip_preflight: true,
            max_retries: None,
        }
    }
}

/// Byte-match filter for program account scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Whether `data` satisfies this filter.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }
}

/// Account lookup, balance query and transaction submission against a ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance of `address` in lamports.
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// A recent blockhash to anchor a new transaction.
    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Submit a fully signed transaction and wait until it is confirmed.
    async fn send_and_confirm(
        &self,
        transaction: &Transaction,
        options: SubmitOptions,
    ) -> Result<Signature>;

    /// Raw data of an account. Fails with `AccountNotFound` when it does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>>;

    /// Every account owned by `program_id` matching all `filters`.
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>>;
}

/// Tunables for [`RpcLedgerClient`].
#[derive(Debug, Clone)]
pub struct RpcLedgerConfig {
    pub commitment: CommitmentConfig,
    /// Delay between signature status polls.
    pub poll_interval: Duration,
    /// Upper bound on confirmation polling, on top of blockhash expiry.
    pub confirm_timeout: Duration,
}

impl Default for RpcLedgerConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::confirmed(),
            poll_interval: Duration::from_millis(500),
            confirm_timeout: Duration::from_secs(90),
        }
    }
}

/// [`LedgerClient`] backed by a Solana JSON-RPC node.
pub struct RpcLedgerClient {
    rpc_client: RpcClient,
    config: RpcLedgerConfig,
}

impl RpcLedgerClient {
    pub fn new(url: impl Into<String>, config: RpcLedgerConfig) -> Self {
        let rpc_client = RpcClient::new_with_commitment(url.into(), config.commitment);
        Self { rpc_client, config }
    }

    pub fn url(&self) -> String {
        self.rpc_client.url()
    }

    /// Poll the signature until it reaches the configured commitment, fails,
    /// or its blockhash expires.
    async fn confirm(&self, signature: &Signature, blockhash: &Hash) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.signature_landed(signature).await? {
                return Ok(());
            }

            if !self
                .rpc_client
                .is_blockhash_valid(blockhash, self.config.commitment)
                .await?
            {
                // may have landed in the last slot the blockhash was valid for
                if self.signature_landed(signature).await? {
                    return Ok(());
                }
                return Err(CurveClientError::BlockhashExpired(*signature));
            }
            let elapsed = started.elapsed();
            if elapsed >= self.config.confirm_timeout {
                return Err(CurveClientError::ConfirmationTimeout {
                    signature: *signature,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
            debug!("waiting for confirmation of {}", signature);
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// `Ok(true)` once the signature reached the configured commitment,
    /// `Ok(false)` while it is unknown, and an error if it executed and failed.
    async fn signature_landed(&self, signature: &Signature) -> Result<bool> {
        let status = self
            .rpc_client
            .get_signature_status_with_commitment(signature, self.config.commitment)
            .await?;
        match status {
            Some(Ok(())) => Ok(true),
            Some(Err(err)) => Err(CurveClientError::TransactionFailed {
                signature: *signature,
                reason: err.to_string(),
            }),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.rpc_client.get_balance(address).await?)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(self.rpc_client.get_latest_blockhash().await?)
    }

    async fn send_and_confirm(
        &self,
        transaction: &Transaction,
        options: SubmitOptions,
    ) -> Result<Signature> {
        let send_config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(self.config.commitment.commitment),
            max_retries: options.max_retries,
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .rpc_client
            .send_transaction_with_config(transaction, send_config)
            .await?;
        debug!("submitted {} (skip_preflight={})", signature, options.skip_preflight);

        if let Err(err) = self
            .confirm(&signature, &transaction.message.recent_blockhash)
            .await
        {
            warn!("confirmation of {} failed: {}", signature, err);
            return Err(err);
        }
        Ok(signature)
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>> {
        self.rpc_client
            .get_account_with_commitment(address, self.config.commitment)
            .await?
            .value
            .map(|account| account.data)
            .ok_or(CurveClientError::AccountNotFound(*address))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(
                filters
                    .iter()
                    .map(|filter| {
                        RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                            filter.offset,
                            &filter.bytes,
                        ))
                    })
                    .collect(),
            ),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.config.commitment),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .rpc_client
            .get_program_accounts_with_config(program_id, config)
            .await?;
        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        assert_matches::assert_matches,
        serde_json::json,
        solana_rpc_client::mock_sender::Mocks,
        solana_rpc_client_api::request::RpcRequest,
    };

    fn mock_ledger(url: &str, mocks: Mocks) -> RpcLedgerClient {
        let config = RpcLedgerConfig {
            poll_interval: Duration::from_millis(1),
            ..RpcLedgerConfig::default()
        };
        RpcLedgerClient {
            rpc_client: RpcClient::new_mock_with_mocks(url.to_string(), mocks),
            config,
        }
    }

    fn expired_blockhash() -> Mocks {
        Mocks::from([(
            RpcRequest::IsBlockhashValid,
            json!({"context": {"slot": 1}, "value": false}),
        )])
    }

    #[tokio::test]
    async fn landing_in_the_last_valid_slot_is_confirmed() {
        let mut mocks = expired_blockhash();
        // unknown on the first poll, finalized on the recheck
        mocks.insert(
            RpcRequest::GetSignatureStatuses,
            json!({"context": {"slot": 1}, "value": [null]}),
        );
        let ledger = mock_ledger("succeeds", mocks);
        ledger
            .confirm(&Signature::from([1u8; 64]), &Hash::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn never_landing_reports_blockhash_expired() {
        let ledger = mock_ledger("sig_not_found", expired_blockhash());
        let signature = Signature::from([2u8; 64]);
        assert_matches!(
            ledger.confirm(&signature, &Hash::default()).await,
            Err(CurveClientError::BlockhashExpired(sig)) if sig == signature
        );
    }

    #[tokio::test]
    async fn execution_error_is_a_failed_transaction() {
        let ledger = mock_ledger("instruction_error", Mocks::default());
        assert_matches!(
            ledger
                .confirm(&Signature::from([3u8; 64]), &Hash::default())
                .await,
            Err(CurveClientError::TransactionFailed { .. })
        );
    }

    #[test]
    fn memcmp_filter_matches_exact_window() {
        let filter = MemcmpFilter::new(2, vec![7, 8]);
        assert!(filter.matches(&[0, 1, 7, 8, 9]));
        assert!(!filter.matches(&[0, 1, 7, 9, 9]));
    }

    #[test]
    fn memcmp_filter_rejects_short_data() {
        let filter = MemcmpFilter::new(4, vec![1, 2, 3]);
        assert!(!filter.matches(&[0, 0, 0, 0, 1, 2]));
        assert!(!filter.matches(&[]));
    }

    #[test]
    fn submit_option_presets() {
        assert_eq!(
            SubmitOptions::simulated(3),
            SubmitOptions {
                skip_preflight: false,
                max_retries: Some(3)
            }
        );
        assert!(SubmitOptions::unsimulated().skip_preflight);
    }
}
