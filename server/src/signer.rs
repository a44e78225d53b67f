//! Fee-payer credential sources.
//!
//! A [`SignerProvider`] hands out the service wallet for the duration of one
//! provisioning request. A missing or undecodable secret surfaces as a
//! [`CredentialError`] on every acquisition instead of aborting startup, so
//! the read-only endpoints keep working without a wallet.

use {
    log::warn,
    solana_keypair::Keypair,
    std::{
        fs,
        path::{Path, PathBuf},
        sync::Arc,
    },
    thiserror::Error,
};

const SECRET_KEY_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no signer secret configured (set PRIVATE_KEY or KEYPAIR_PATH)")]
    Missing,

    #[error("signer secret is not valid base58: {0}")]
    InvalidEncoding(String),

    #[error("signer secret must be {SECRET_KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("signer secret is not a valid ed25519 keypair: {0}")]
    InvalidKeypair(String),

    #[error("failed to read keypair file {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

pub trait SignerProvider: Send + Sync {
    /// The wallet that pays for and signs provisioning transactions.
    fn acquire(&self) -> Result<Arc<Keypair>, CredentialError>;
}

fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair, CredentialError> {
    if bytes.len() != SECRET_KEY_LEN {
        return Err(CredentialError::InvalidLength(bytes.len()));
    }
    Keypair::try_from(bytes).map_err(|err| CredentialError::InvalidKeypair(err.to_string()))
}

/// Base58-encoded 64-byte secret, decoded once at construction.
pub struct Base58Signer {
    keypair: Result<Arc<Keypair>, CredentialError>,
}

impl Base58Signer {
    pub fn new(secret: Option<&str>) -> Self {
        let keypair = match secret.map(str::trim).filter(|s| !s.is_empty()) {
            None => Err(CredentialError::Missing),
            Some(encoded) => bs58::decode(encoded)
                .into_vec()
                .map_err(|err| CredentialError::InvalidEncoding(err.to_string()))
                .and_then(|bytes| keypair_from_bytes(&bytes))
                .map(Arc::new),
        };
        if let Err(err) = &keypair {
            warn!("signer unavailable: {err}");
        }
        Self { keypair }
    }
}

impl From<Keypair> for Base58Signer {
    fn from(keypair: Keypair) -> Self {
        Self {
            keypair: Ok(Arc::new(keypair)),
        }
    }
}

impl SignerProvider for Base58Signer {
    fn acquire(&self) -> Result<Arc<Keypair>, CredentialError> {
        self.keypair.clone()
    }
}

/// Keypair file in the Solana CLI format: a JSON array of 64 bytes.
///
/// Read once at construction; later changes to the file are not picked up.
pub struct KeypairFileSigner {
    keypair: Result<Arc<Keypair>, CredentialError>,
}

impl KeypairFileSigner {
    pub fn new(path: PathBuf) -> Self {
        let keypair = read_keypair_file(&path).map(Arc::new);
        if let Err(err) = &keypair {
            warn!("signer unavailable: {err}");
        }
        Self { keypair }
    }
}

fn read_keypair_file(path: &Path) -> Result<Keypair, CredentialError> {
    let unreadable = |reason: String| CredentialError::Unreadable {
        path: path.display().to_string(),
        reason,
    };
    let contents = fs::read_to_string(path).map_err(|err| unreadable(err.to_string()))?;
    let bytes: Vec<u8> =
        serde_json::from_str(&contents).map_err(|err| unreadable(err.to_string()))?;
    keypair_from_bytes(&bytes)
}

impl SignerProvider for KeypairFileSigner {
    fn acquire(&self) -> Result<Arc<Keypair>, CredentialError> {
        self.keypair.clone()
    }
}
