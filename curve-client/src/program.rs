//! Dynamic Bonding Curve program client.
//!
//! Instruction builders are plain functions; queries go through a shared
//! [`LedgerClient`] held by [`DbcProgram`].
//!
//! ## Account layouts
//!
//! Only the fields this service reads are decoded. Offsets include the
//! 8-byte account discriminator.
//!
//! ```text
//! VirtualPool  [0..8] discriminator  [8..72] volatility tracker
//!              [72..104] config      [104..136] creator
//!              [136..168] base mint  [168..200] base vault
//!              [200..232] quote vault
//!              [232..240] base reserve (u64-le)
//!              [240..248] quote reserve (u64-le)
//!
//! PoolConfig   [0..8] discriminator  [8..40] quote mint
//!              [40..72] fee claimer  [72..104] leftover receiver
//!              [104..232] pool fees  [232..256] mode/percentage flags
//!              [256..264] swap base amount (u64-le)
//!              [264..272] migration quote threshold (u64-le)
//! ```

use {
    crate::{
        builder::TokenType,
        constants::{
            seeds, DBC_PROGRAM_ID, METADATA_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
        },
        error::{CurveClientError, Result},
        ledger::{LedgerClient, MemcmpFilter},
        params::{ConfigParameters, InitializePoolParameters},
    },
    borsh::BorshSerialize,
    log::debug,
    sha2::{Digest, Sha256},
    solana_instruction::{AccountMeta, Instruction},
    solana_pubkey::Pubkey,
    solana_sdk_ids::system_program,
    std::sync::Arc,
};

pub const POOL_CONFIG_OFFSET: usize = 72;
const POOL_CREATOR_OFFSET: usize = 104;
const POOL_BASE_MINT_OFFSET: usize = 136;
const POOL_BASE_VAULT_OFFSET: usize = 168;
const POOL_QUOTE_VAULT_OFFSET: usize = 200;
const POOL_BASE_RESERVE_OFFSET: usize = 232;
const POOL_QUOTE_RESERVE_OFFSET: usize = 240;
const POOL_MIN_LEN: usize = 248;

const CONFIG_QUOTE_MINT_OFFSET: usize = 8;
const CONFIG_FEE_CLAIMER_OFFSET: usize = 40;
const CONFIG_LEFTOVER_RECEIVER_OFFSET: usize = 72;
const CONFIG_TOKEN_TYPE_OFFSET: usize = 237;
const CONFIG_SWAP_BASE_AMOUNT_OFFSET: usize = 256;
const CONFIG_MIGRATION_QUOTE_THRESHOLD_OFFSET: usize = 264;
const CONFIG_MIN_LEN: usize = 272;

// ── Discriminators ──────────────────────────────────────────────────

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Anchor instruction discriminator.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// Anchor account discriminator.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> Result<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

// ── PDAs ────────────────────────────────────────────────────────────

pub fn derive_pool_authority(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[seeds::POOL_AUTHORITY], program_id).0
}

pub fn derive_event_authority(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[seeds::EVENT_AUTHORITY], program_id).0
}

/// Pool address for `(config, base_mint, quote_mint)`; the mints are ordered
/// larger-first so the address does not depend on argument order.
pub fn derive_pool(
    program_id: &Pubkey,
    config: &Pubkey,
    base_mint: &Pubkey,
    quote_mint: &Pubkey,
) -> Pubkey {
    let (first, second) = if base_mint.as_ref() > quote_mint.as_ref() {
        (base_mint, quote_mint)
    } else {
        (quote_mint, base_mint)
    };
    Pubkey::find_program_address(
        &[
            seeds::POOL,
            config.as_ref(),
            first.as_ref(),
            second.as_ref(),
        ],
        program_id,
    )
    .0
}

pub fn derive_token_vault(program_id: &Pubkey, mint: &Pubkey, pool: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[seeds::TOKEN_VAULT, mint.as_ref(), pool.as_ref()],
        program_id,
    )
    .0
}

pub fn derive_mint_metadata(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            seeds::METADATA,
            METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &METADATA_PROGRAM_ID,
    )
    .0
}

// ── Account decoding ────────────────────────────────────────────────

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn check_account(address: &Pubkey, data: &[u8], name: &str, min_len: usize) -> Result<()> {
    if data.len() < min_len {
        return Err(CurveClientError::InvalidAccountData {
            address: *address,
            reason: format!("{name} needs at least {min_len} bytes, got {}", data.len()),
        });
    }
    if data[..8] != account_discriminator(name) {
        return Err(CurveClientError::InvalidAccountData {
            address: *address,
            reason: format!("not a {name} account"),
        });
    }
    Ok(())
}

/// The parts of a `VirtualPool` account this service reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPoolState {
    pub config: Pubkey,
    pub creator: Pubkey,
    pub base_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
}

impl VirtualPoolState {
    pub const NAME: &'static str = "VirtualPool";

    pub fn decode(address: &Pubkey, data: &[u8]) -> Result<Self> {
        check_account(address, data, Self::NAME, POOL_MIN_LEN)?;
        Ok(Self {
            config: read_pubkey(data, POOL_CONFIG_OFFSET),
            creator: read_pubkey(data, POOL_CREATOR_OFFSET),
            base_mint: read_pubkey(data, POOL_BASE_MINT_OFFSET),
            base_vault: read_pubkey(data, POOL_BASE_VAULT_OFFSET),
            quote_vault: read_pubkey(data, POOL_QUOTE_VAULT_OFFSET),
            base_reserve: read_u64(data, POOL_BASE_RESERVE_OFFSET),
            quote_reserve: read_u64(data, POOL_QUOTE_RESERVE_OFFSET),
        })
    }

    /// Encode into an account image laid out like the program's.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn to_account_data(&self) -> Vec<u8> {
        let mut data = vec![0u8; POOL_MIN_LEN];
        data[..8].copy_from_slice(&account_discriminator(Self::NAME));
        for (offset, key) in [
            (POOL_CONFIG_OFFSET, &self.config),
            (POOL_CREATOR_OFFSET, &self.creator),
            (POOL_BASE_MINT_OFFSET, &self.base_mint),
            (POOL_BASE_VAULT_OFFSET, &self.base_vault),
            (POOL_QUOTE_VAULT_OFFSET, &self.quote_vault),
        ] {
            data[offset..offset + 32].copy_from_slice(key.as_ref());
        }
        data[POOL_BASE_RESERVE_OFFSET..POOL_BASE_RESERVE_OFFSET + 8]
            .copy_from_slice(&self.base_reserve.to_le_bytes());
        data[POOL_QUOTE_RESERVE_OFFSET..POOL_QUOTE_RESERVE_OFFSET + 8]
            .copy_from_slice(&self.quote_reserve.to_le_bytes());
        data
    }
}

/// The parts of a `PoolConfig` account this service reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfigState {
    pub quote_mint: Pubkey,
    pub fee_claimer: Pubkey,
    pub leftover_receiver: Pubkey,
    pub token_type: u8,
    pub swap_base_amount: u64,
    pub migration_quote_threshold: u64,
}

impl PoolConfigState {
    pub const NAME: &'static str = "PoolConfig";

    pub fn decode(address: &Pubkey, data: &[u8]) -> Result<Self> {
        check_account(address, data, Self::NAME, CONFIG_MIN_LEN)?;
        Ok(Self {
            quote_mint: read_pubkey(data, CONFIG_QUOTE_MINT_OFFSET),
            fee_claimer: read_pubkey(data, CONFIG_FEE_CLAIMER_OFFSET),
            leftover_receiver: read_pubkey(data, CONFIG_LEFTOVER_RECEIVER_OFFSET),
            token_type: data[CONFIG_TOKEN_TYPE_OFFSET],
            swap_base_amount: read_u64(data, CONFIG_SWAP_BASE_AMOUNT_OFFSET),
            migration_quote_threshold: read_u64(data, CONFIG_MIGRATION_QUOTE_THRESHOLD_OFFSET),
        })
    }

    /// Encode into an account image laid out like the program's.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn to_account_data(&self) -> Vec<u8> {
        let mut data = vec![0u8; CONFIG_MIN_LEN];
        data[..8].copy_from_slice(&account_discriminator(Self::NAME));
        for (offset, key) in [
            (CONFIG_QUOTE_MINT_OFFSET, &self.quote_mint),
            (CONFIG_FEE_CLAIMER_OFFSET, &self.fee_claimer),
            (CONFIG_LEFTOVER_RECEIVER_OFFSET, &self.leftover_receiver),
        ] {
            data[offset..offset + 32].copy_from_slice(key.as_ref());
        }
        data[CONFIG_TOKEN_TYPE_OFFSET] = self.token_type;
        data[CONFIG_SWAP_BASE_AMOUNT_OFFSET..CONFIG_SWAP_BASE_AMOUNT_OFFSET + 8]
            .copy_from_slice(&self.swap_base_amount.to_le_bytes());
        data[CONFIG_MIGRATION_QUOTE_THRESHOLD_OFFSET..CONFIG_MIGRATION_QUOTE_THRESHOLD_OFFSET + 8]
            .copy_from_slice(&self.migration_quote_threshold.to_le_bytes());
        data
    }
}

// ── Instructions ────────────────────────────────────────────────────

/// Accounts of `create_config`.
#[derive(Debug, Clone, Copy)]
pub struct CreateConfigAccounts {
    /// Freshly generated; must sign.
    pub config: Pubkey,
    pub fee_claimer: Pubkey,
    pub leftover_receiver: Pubkey,
    pub quote_mint: Pubkey,
    /// Fee payer; must sign.
    pub payer: Pubkey,
}

pub fn create_config_instruction(
    program_id: &Pubkey,
    accounts: &CreateConfigAccounts,
    params: &ConfigParameters,
) -> Result<Instruction> {
    let metas = vec![
        AccountMeta::new(accounts.config, true),
        AccountMeta::new_readonly(accounts.fee_claimer, false),
        AccountMeta::new_readonly(accounts.leftover_receiver, false),
        AccountMeta::new_readonly(accounts.quote_mint, false),
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(derive_event_authority(program_id), false),
        AccountMeta::new_readonly(*program_id, false),
    ];
    Ok(Instruction::new_with_bytes(
        *program_id,
        &instruction_data("create_config", params)?,
        metas,
    ))
}

/// Accounts of the pool initialization instructions.
#[derive(Debug, Clone, Copy)]
pub struct CreatePoolAccounts {
    pub config: Pubkey,
    /// Freshly generated; must sign.
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    /// Pool creator; must sign.
    pub creator: Pubkey,
    /// Fee payer; must sign.
    pub payer: Pubkey,
}

/// Pool initialization instruction for the configuration's token program.
///
/// Returns the instruction together with the address of the pool it creates.
pub fn create_pool_instruction(
    program_id: &Pubkey,
    token_type: TokenType,
    accounts: &CreatePoolAccounts,
    params: &InitializePoolParameters,
) -> Result<(Instruction, Pubkey)> {
    let pool = derive_pool(
        program_id,
        &accounts.config,
        &accounts.base_mint,
        &accounts.quote_mint,
    );
    let base_vault = derive_token_vault(program_id, &accounts.base_mint, &pool);
    let quote_vault = derive_token_vault(program_id, &accounts.quote_mint, &pool);

    let mut metas = vec![
        AccountMeta::new_readonly(accounts.config, false),
        AccountMeta::new_readonly(derive_pool_authority(program_id), false),
        AccountMeta::new_readonly(accounts.creator, true),
        AccountMeta::new(accounts.base_mint, true),
        AccountMeta::new(pool, false),
        AccountMeta::new(base_vault, false),
        AccountMeta::new(quote_vault, false),
        AccountMeta::new_readonly(accounts.quote_mint, false),
    ];
    let (name, base_token_program) = match token_type {
        TokenType::SplToken => {
            metas.push(AccountMeta::new(derive_mint_metadata(&accounts.base_mint), false));
            metas.push(AccountMeta::new_readonly(METADATA_PROGRAM_ID, false));
            ("initialize_virtual_pool_with_spl_token", TOKEN_PROGRAM_ID)
        }
        TokenType::Token2022 => (
            "initialize_virtual_pool_with_token2022",
            TOKEN_2022_PROGRAM_ID,
        ),
    };
    metas.extend([
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        AccountMeta::new_readonly(base_token_program, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(derive_event_authority(program_id), false),
        AccountMeta::new_readonly(*program_id, false),
    ]);

    let instruction =
        Instruction::new_with_bytes(*program_id, &instruction_data(name, params)?, metas);
    Ok((instruction, pool))
}

// ── Queries ─────────────────────────────────────────────────────────

/// Read-side client of the program.
#[derive(Clone)]
pub struct DbcProgram {
    ledger: Arc<dyn LedgerClient>,
    program_id: Pubkey,
}

impl DbcProgram {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_program_id(ledger, DBC_PROGRAM_ID)
    }

    pub fn with_program_id(ledger: Arc<dyn LedgerClient>, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub async fn pool_config(&self, config: &Pubkey) -> Result<PoolConfigState> {
        let data = self.ledger.get_account_data(config).await?;
        PoolConfigState::decode(config, &data)
    }

    pub async fn pool(&self, pool: &Pubkey) -> Result<VirtualPoolState> {
        let data = self.ledger.get_account_data(pool).await?;
        VirtualPoolState::decode(pool, &data)
    }

    /// Every pool bound to `config`, ordered by pool address.
    pub async fn pools_by_config(&self, config: &Pubkey) -> Result<Vec<(Pubkey, VirtualPoolState)>> {
        let filters = [
            MemcmpFilter::new(0, account_discriminator(VirtualPoolState::NAME)),
            MemcmpFilter::new(POOL_CONFIG_OFFSET, config.to_bytes()),
        ];
        let accounts = self
            .ledger
            .get_program_accounts(&self.program_id, &filters)
            .await?;
        let mut pools = accounts
            .iter()
            .map(|(address, data)| Ok((*address, VirtualPoolState::decode(address, data)?)))
            .collect::<Result<Vec<_>>>()?;
        pools.sort_by(|(a, _), (b, _)| a.as_ref().cmp(b.as_ref()));
        debug!("config {} has {} pool(s)", config, pools.len());
        Ok(pools)
    }

    /// Quote reserve over the migration threshold of the pool's own config,
    /// clamped to `[0, 1]`.
    pub async fn pool_curve_progress(&self, pool: &VirtualPoolState) -> Result<f64> {
        let config = self.pool_config(&pool.config).await?;
        Ok(curve_progress(
            pool.quote_reserve,
            config.migration_quote_threshold,
        ))
    }
}

/// Progress ratio of a pool toward migration.
pub fn curve_progress(quote_reserve: u64, migration_quote_threshold: u64) -> f64 {
    if migration_quote_threshold == 0 {
        return 1.0;
    }
    (quote_reserve as f64 / migration_quote_threshold as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{constants::NATIVE_MINT, fake::FakeLedger},
        assert_matches::assert_matches,
    };

    fn sample_pool(config: Pubkey) -> VirtualPoolState {
        VirtualPoolState {
            config,
            creator: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            base_reserve: 900_000_000,
            quote_reserve: 12_345,
        }
    }

    #[test]
    fn virtual_pool_decodes_its_own_image() {
        let pool = sample_pool(Pubkey::new_unique());
        let data = pool.to_account_data();
        assert_eq!(&data[POOL_CONFIG_OFFSET..POOL_CONFIG_OFFSET + 32], pool.config.as_ref());
        assert_eq!(VirtualPoolState::decode(&Pubkey::new_unique(), &data).unwrap(), pool);
    }

    #[test]
    fn pool_config_rejects_wrong_discriminator() {
        let pool = sample_pool(Pubkey::new_unique());
        let mut data = pool.to_account_data();
        data.resize(CONFIG_MIN_LEN, 0);
        assert_matches!(
            PoolConfigState::decode(&Pubkey::new_unique(), &data),
            Err(CurveClientError::InvalidAccountData { .. })
        );
    }

    #[test]
    fn short_account_is_rejected() {
        assert_matches!(
            VirtualPoolState::decode(&Pubkey::new_unique(), &[0u8; 16]),
            Err(CurveClientError::InvalidAccountData { .. })
        );
    }

    #[test]
    fn pool_address_ignores_mint_order() {
        let config = Pubkey::new_unique();
        let base = Pubkey::new_unique();
        assert_eq!(
            derive_pool(&DBC_PROGRAM_ID, &config, &base, &NATIVE_MINT),
            derive_pool(&DBC_PROGRAM_ID, &config, &NATIVE_MINT, &base),
        );
    }

    #[test]
    fn create_config_requires_config_and_payer_signatures() {
        let accounts = CreateConfigAccounts {
            config: Pubkey::new_unique(),
            fee_claimer: Pubkey::new_unique(),
            leftover_receiver: Pubkey::new_unique(),
            quote_mint: NATIVE_MINT,
            payer: Pubkey::new_unique(),
        };
        let ix = create_config_instruction(&DBC_PROGRAM_ID, &accounts, &ConfigParameters::default())
            .unwrap();
        let signers: Vec<_> = ix
            .accounts
            .iter()
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .collect();
        assert_eq!(signers, vec![accounts.config, accounts.payer]);
        assert_eq!(ix.data[..8], instruction_discriminator("create_config"));
    }

    #[test]
    fn token2022_pool_skips_metadata_accounts() {
        let accounts = CreatePoolAccounts {
            config: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: NATIVE_MINT,
            creator: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
        };
        let params = InitializePoolParameters {
            name: "Name".into(),
            symbol: "SYM".into(),
            uri: "https://example.com/meta.json".into(),
        };
        let (token2022, pool) =
            create_pool_instruction(&DBC_PROGRAM_ID, TokenType::Token2022, &accounts, &params)
                .unwrap();
        let (spl, spl_pool) =
            create_pool_instruction(&DBC_PROGRAM_ID, TokenType::SplToken, &accounts, &params)
                .unwrap();

        assert_eq!(pool, spl_pool);
        assert_eq!(token2022.accounts.len() + 2, spl.accounts.len());
        assert!(!token2022
            .accounts
            .iter()
            .any(|meta| meta.pubkey == METADATA_PROGRAM_ID));
        assert_eq!(
            token2022.data[..8],
            instruction_discriminator("initialize_virtual_pool_with_token2022")
        );
    }

    #[tokio::test]
    async fn curve_progress_reads_pool_and_config() {
        let ledger = Arc::new(FakeLedger::default());
        let program = DbcProgram::new(ledger.clone());
        let config = Pubkey::new_unique();
        let config_state = PoolConfigState {
            quote_mint: NATIVE_MINT,
            fee_claimer: Pubkey::new_unique(),
            leftover_receiver: Pubkey::new_unique(),
            token_type: TokenType::Token2022 as u8,
            swap_base_amount: 0,
            migration_quote_threshold: 50_000,
        };
        ledger.insert_account(config, DBC_PROGRAM_ID, config_state.to_account_data());
        let pool = Pubkey::new_unique();
        ledger.insert_account(pool, DBC_PROGRAM_ID, sample_pool(config).to_account_data());

        let pools = program.pools_by_config(&config).await.unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].0, pool);
        let pool_state = program.pool(&pool).await.unwrap();
        // 12_345 / 50_000
        assert_eq!(program.pool_curve_progress(&pool_state).await.unwrap(), 0.2469);
        assert_eq!(program.pool_config(&config).await.unwrap(), config_state);
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(curve_progress(0, 100), 0.0);
        assert_eq!(curve_progress(50, 100), 0.5);
        assert_eq!(curve_progress(250, 100), 1.0);
        assert_eq!(curve_progress(1, 0), 1.0);
    }
}
