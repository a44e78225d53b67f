//! Migration progress of the pool bound to a configuration.

use {
    crate::error::ProgressError,
    chrono::{SecondsFormat, Utc},
    launchpad_curve_client::DbcProgram,
    log::{info, warn},
    solana_pubkey::Pubkey,
    std::str::FromStr,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PoolProgress {
    pub pool_address: Pubkey,
    /// Quote reserve over migration threshold, in `[0, 1]`.
    pub progress: f64,
    /// `progress` as a percentage with four decimals, e.g. `"12.3450%"`.
    pub progress_in_percent: String,
    /// RFC 3339, millisecond precision, UTC.
    pub timestamp: String,
}

pub fn format_percent(progress: f64) -> String {
    format!("{:.4}%", progress * 100.0)
}

pub struct ProgressReader {
    program: DbcProgram,
}

impl ProgressReader {
    pub fn new(program: DbcProgram) -> Self {
        Self { program }
    }

    pub async fn get_progress(&self, config_address: &str) -> Result<PoolProgress, ProgressError> {
        let config = Pubkey::from_str(config_address.trim()).map_err(|_| {
            ProgressError::Validation(format!(
                "config address {config_address:?} is not a valid address"
            ))
        })?;

        let pools = self.program.pools_by_config(&config).await?;
        let (pool_address, pool) = match pools.as_slice() {
            [] => return Err(ProgressError::NotFound(config)),
            [first, rest @ ..] => {
                if !rest.is_empty() {
                    warn!(
                        "config {config} has {} pools, reporting the first: {}",
                        pools.len(),
                        first.0
                    );
                }
                first
            }
        };

        let progress = self.program.pool_curve_progress(pool).await?;
        info!("pool {pool_address} of config {config} is at {progress}");

        Ok(PoolProgress {
            pool_address: *pool_address,
            progress,
            progress_in_percent: format_percent(progress),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        assert_matches::assert_matches,
        launchpad_curve_client::{
            constants::{DBC_PROGRAM_ID, NATIVE_MINT},
            fake::FakeLedger,
            program::{PoolConfigState, VirtualPoolState},
        },
        std::sync::Arc,
        test_case::test_case,
    };

    fn seed_config(ledger: &FakeLedger, threshold: u64) -> Pubkey {
        let config = Pubkey::new_unique();
        let state = PoolConfigState {
            quote_mint: NATIVE_MINT,
            fee_claimer: Pubkey::new_unique(),
            leftover_receiver: Pubkey::new_unique(),
            token_type: 1,
            swap_base_amount: 0,
            migration_quote_threshold: threshold,
        };
        ledger.insert_account(config, DBC_PROGRAM_ID, state.to_account_data());
        config
    }

    fn seed_pool(ledger: &FakeLedger, address: Pubkey, config: Pubkey, quote_reserve: u64) {
        let state = VirtualPoolState {
            config,
            creator: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            base_reserve: 1_000,
            quote_reserve,
        };
        ledger.insert_account(address, DBC_PROGRAM_ID, state.to_account_data());
    }

    fn reader(ledger: &Arc<FakeLedger>) -> ProgressReader {
        ProgressReader::new(DbcProgram::new(ledger.clone()))
    }

    #[test_case(0.12345, "12.3450%")]
    #[test_case(0.0, "0.0000%")]
    #[test_case(1.0, "100.0000%")]
    fn percent_has_four_decimals(progress: f64, expected: &str) {
        assert_eq!(format_percent(progress), expected);
    }

    #[tokio::test]
    async fn single_pool_progress() {
        let ledger = Arc::new(FakeLedger::default());
        let config = seed_config(&ledger, 100_000);
        let pool = Pubkey::new_unique();
        seed_pool(&ledger, pool, config, 12_345);

        let progress = reader(&ledger)
            .get_progress(&config.to_string())
            .await
            .unwrap();
        assert_eq!(progress.pool_address, pool);
        assert!((progress.progress - 0.12345).abs() < 1e-12);
        assert_eq!(progress.progress_in_percent, "12.3450%");
        assert!(progress.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&progress.timestamp).is_ok());
    }

    #[tokio::test]
    async fn progress_is_capped_at_one() {
        let ledger = Arc::new(FakeLedger::default());
        let config = seed_config(&ledger, 1_000);
        seed_pool(&ledger, Pubkey::new_unique(), config, 5_000);
        let progress = reader(&ledger)
            .get_progress(&config.to_string())
            .await
            .unwrap();
        assert_eq!(progress.progress, 1.0);
        assert_eq!(progress.progress_in_percent, "100.0000%");
    }

    #[tokio::test]
    async fn lowest_pool_address_wins() {
        let ledger = Arc::new(FakeLedger::default());
        let config = seed_config(&ledger, 1_000);
        let mut pools = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
        for (i, pool) in pools.iter().enumerate() {
            seed_pool(&ledger, *pool, config, 100 * i as u64);
        }
        pools.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));

        let progress = reader(&ledger)
            .get_progress(&config.to_string())
            .await
            .unwrap();
        assert_eq!(progress.pool_address, pools[0]);
    }

    #[tokio::test]
    async fn pools_of_other_configs_are_ignored() {
        let ledger = Arc::new(FakeLedger::default());
        let config = seed_config(&ledger, 1_000);
        let other = seed_config(&ledger, 1_000);
        seed_pool(&ledger, Pubkey::new_unique(), other, 10);

        assert_matches!(
            reader(&ledger).get_progress(&config.to_string()).await,
            Err(ProgressError::NotFound(missing)) if missing == config
        );
    }

    #[tokio::test]
    async fn invalid_address_is_rejected_without_ledger_calls() {
        let ledger = Arc::new(FakeLedger::default());
        assert_matches!(
            reader(&ledger).get_progress("definitely-not-base58!").await,
            Err(ProgressError::Validation(_))
        );
        assert_eq!(ledger.calls().total(), 0);
    }

    #[tokio::test]
    async fn missing_config_account_is_a_ledger_error() {
        let ledger = Arc::new(FakeLedger::default());
        let config = Pubkey::new_unique();
        seed_pool(&ledger, Pubkey::new_unique(), config, 10);
        assert_matches!(
            reader(&ledger).get_progress(&config.to_string()).await,
            Err(ProgressError::Ledger(_))
        );
    }
}
