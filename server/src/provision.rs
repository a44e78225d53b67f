//! Two-phase provisioning: a curve configuration, then a pool bound to it.
//!
//! ```text
//! Start ─► ConfigPending ─► ConfigConfirmed ─► PoolPending ─► PoolConfirmed
//!               │                                  │
//!               ▼                                  ▼
//!          ConfigFailed                 ConfigCreatedPoolMissing
//! ```
//!
//! Nothing is rolled back: a pool failure leaves the confirmed configuration
//! on the ledger and the error reports its address and signature. Every run
//! creates fresh accounts.

use {
    crate::{
        config::Cluster,
        error::ProvisionError,
        signer::SignerProvider,
    },
    launchpad_curve_client::{
        build_curve,
        constants::NATIVE_MINT,
        params::{ConfigParameters, InitializePoolParameters},
        parse_quote_threshold,
        program::{
            create_config_instruction, create_pool_instruction, derive_pool,
            CreateConfigAccounts, CreatePoolAccounts,
        },
        CurveClientError, CurveDefaults, DbcProgram, SubmitOptions,
    },
    log::{error, info},
    solana_instruction::Instruction,
    solana_keypair::Keypair,
    solana_native_token::LAMPORTS_PER_SOL,
    solana_pubkey::Pubkey,
    solana_signature::Signature,
    solana_signer::Signer,
    solana_transaction::Transaction,
    std::{fmt, str::FromStr, sync::Arc},
};

/// Node-side rebroadcast attempts for the config transaction.
pub const CONFIG_SUBMIT_RETRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Start,
    ConfigPending,
    ConfigConfirmed,
    PoolPending,
    PoolConfirmed,
    ConfigFailed,
    ConfigCreatedPoolMissing,
    AccountingFailed,
    ReportingFailed,
}

impl ProvisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ConfigPending => "config_pending",
            Self::ConfigConfirmed => "config_confirmed",
            Self::PoolPending => "pool_pending",
            Self::PoolConfirmed => "pool_confirmed",
            Self::ConfigFailed => "config_failed",
            Self::ConfigCreatedPoolMissing => "config_created_pool_missing",
            Self::AccountingFailed => "accounting_failed",
            Self::ReportingFailed => "reporting_failed",
        }
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Caller input, unvalidated.
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    pub fee_claimer: Option<String>,
    /// Whole quote tokens, in decimal notation.
    pub quote_threshold: Option<String>,
    pub pool_metadata: Option<PoolMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    pub wallet: Pubkey,
    pub fee_claimer: Pubkey,
    pub cluster: Cluster,
    pub config_address: Pubkey,
    pub config_signature: Signature,
    pub config_explorer_url: String,
    pub pool_address: Pubkey,
    pub base_mint: Pubkey,
    pub pool_signature: Signature,
    pub pool_explorer_url: String,
    /// Balance drop of the wallet over the run, in SOL. Negative if the
    /// wallet was funded while the run was in flight.
    pub sol_spent: f64,
}

/// Everything checked before the first ledger call.
struct Preconditions {
    fee_claimer: Pubkey,
    params: ConfigParameters,
    payer: Arc<Keypair>,
    metadata: InitializePoolParameters,
}

pub struct Provisioner {
    program: DbcProgram,
    signer: Arc<dyn SignerProvider>,
    curve: CurveDefaults,
    cluster: String,
}

impl Provisioner {
    pub fn new(
        program: DbcProgram,
        signer: Arc<dyn SignerProvider>,
        curve: CurveDefaults,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            program,
            signer,
            curve,
            cluster: cluster.into(),
        }
    }

    pub async fn provision(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let Preconditions {
            fee_claimer,
            params,
            payer,
            metadata,
        } = self.check(request)?;
        let wallet = payer.pubkey();
        let ledger = self.program.ledger();
        let program_id = *self.program.program_id();

        let initial_balance = ledger
            .get_balance(&wallet)
            .await
            .map_err(ProvisionError::BalanceUnavailable)?;
        info!(
            "provisioning for fee claimer {fee_claimer} from wallet {wallet} ({initial_balance} lamports)"
        );

        // ── Phase 1: config ──
        let config = Keypair::new();
        let config_address = config.pubkey();
        info!("{}: config {config_address}", ProvisionState::ConfigPending);
        let config_signature = async {
            let instruction = create_config_instruction(
                &program_id,
                &CreateConfigAccounts {
                    config: config_address,
                    fee_claimer,
                    leftover_receiver: fee_claimer,
                    quote_mint: NATIVE_MINT,
                    payer: wallet,
                },
                &params,
            )?;
            let signature = self
                .submit(
                    instruction,
                    &payer,
                    &config,
                    SubmitOptions::simulated(CONFIG_SUBMIT_RETRIES),
                )
                .await?;
            Ok::<_, CurveClientError>(signature)
        }
        .await
        .map_err(|source| {
            error!(
                "{}: config {config_address}: {source}",
                ProvisionState::ConfigFailed
            );
            ProvisionError::ConfigFailed {
                config_address,
                source,
            }
        })?;
        info!(
            "{}: config {config_address} signature {config_signature}",
            ProvisionState::ConfigConfirmed
        );

        // ── Phase 2: pool ──
        let base_mint = Keypair::new();
        let base_mint_address = base_mint.pubkey();
        info!(
            "{}: base mint {base_mint_address} on config {config_address}",
            ProvisionState::PoolPending
        );
        let pool_address = derive_pool(
            &program_id,
            &config_address,
            &base_mint_address,
            &NATIVE_MINT,
        );
        let pool_signature = async {
            let (instruction, _) = create_pool_instruction(
                &program_id,
                self.curve.token_type,
                &CreatePoolAccounts {
                    config: config_address,
                    base_mint: base_mint_address,
                    quote_mint: NATIVE_MINT,
                    creator: wallet,
                    payer: wallet,
                },
                &metadata,
            )?;
            let signature = self
                .submit(instruction, &payer, &base_mint, SubmitOptions::unsimulated())
                .await?;
            Ok::<_, CurveClientError>(signature)
        }
        .await
        .map_err(|source| {
            let pool_signature = source.signature();
            error!(
                "{}: config {config_address} (signature {config_signature}) has no pool \
                 {pool_address} (signature {pool_signature:?}): {source}",
                ProvisionState::ConfigCreatedPoolMissing
            );
            ProvisionError::PoolFailed {
                config_address,
                config_signature,
                pool_address,
                base_mint: base_mint_address,
                pool_signature,
                source,
            }
        })?;
        info!(
            "{}: pool {pool_address} signature {pool_signature}",
            ProvisionState::PoolConfirmed
        );

        // ── Accounting and reporting ──
        let final_balance =
            ledger
                .get_balance(&wallet)
                .await
                .map_err(|source| ProvisionError::AccountingFailed {
                    config_address,
                    config_signature,
                    pool_address,
                    base_mint: base_mint_address,
                    pool_signature,
                    source,
                })?;
        let sol_spent =
            (initial_balance as i128 - final_balance as i128) as f64 / LAMPORTS_PER_SOL as f64;

        let cluster = Cluster::from_str(&self.cluster).map_err(|reason| {
            error!(
                "{}: {reason}; config {config_address} and pool {pool_address} were created",
                ProvisionState::ReportingFailed
            );
            ProvisionError::Reporting {
                cluster: self.cluster.clone(),
                config_address,
                config_signature,
                pool_address,
                base_mint: base_mint_address,
                pool_signature,
            }
        })?;
        info!("provisioned pool {pool_address} on config {config_address}, spent {sol_spent} SOL");

        Ok(ProvisionOutcome {
            wallet,
            fee_claimer,
            cluster,
            config_address,
            config_signature,
            config_explorer_url: cluster.explorer_tx_url(&config_signature),
            pool_address,
            base_mint: base_mint_address,
            pool_signature,
            pool_explorer_url: cluster.explorer_tx_url(&pool_signature),
            sol_spent,
        })
    }

    fn check(&self, request: ProvisionRequest) -> Result<Preconditions, ProvisionError> {
        let fee_claimer = request
            .fee_claimer
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProvisionError::validation("feeclaimer is required"))?;
        let fee_claimer = Pubkey::from_str(fee_claimer).map_err(|_| {
            ProvisionError::validation(format!("feeclaimer {fee_claimer:?} is not a valid address"))
        })?;

        let threshold = request
            .quote_threshold
            .as_deref()
            .ok_or_else(|| ProvisionError::validation("quoteThreshold is required"))?;
        let params = parse_quote_threshold(threshold)
            .and_then(|threshold| build_curve(&self.curve, threshold))
            .map_err(|err| ProvisionError::validation(err.to_string()))?;

        let payer = self.signer.acquire()?;

        let metadata = request
            .pool_metadata
            .ok_or_else(|| ProvisionError::validation("poolData is required"))?;
        for (field, value) in [
            ("name", &metadata.name),
            ("symbol", &metadata.symbol),
            ("uri", &metadata.uri),
        ] {
            if value.trim().is_empty() {
                return Err(ProvisionError::validation(format!(
                    "poolData.{field} is required"
                )));
            }
        }

        Ok(Preconditions {
            fee_claimer,
            params,
            payer,
            metadata: InitializePoolParameters {
                name: metadata.name,
                symbol: metadata.symbol,
                uri: metadata.uri,
            },
        })
    }

    async fn submit(
        &self,
        instruction: Instruction,
        payer: &Keypair,
        co_signer: &Keypair,
        options: SubmitOptions,
    ) -> Result<Signature, CurveClientError> {
        let ledger = self.program.ledger();
        let blockhash = ledger.get_latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer.pubkey()));
        transaction.try_sign(&[payer, co_signer], blockhash)?;
        ledger.send_and_confirm(&transaction, options).await
    }
}
