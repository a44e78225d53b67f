//! Server configuration.
//!
//! Every setting can be passed as a command-line flag or through the
//! environment variable named in its help text.

use {
    crate::signer::{Base58Signer, KeypairFileSigner, SignerProvider},
    clap::{crate_description, crate_name, crate_version, App, Arg, ArgMatches},
    launchpad_curve_client::{builder::CurveDefaults, ledger::RpcLedgerConfig},
    std::{
        ffi::OsString,
        fmt,
        net::{IpAddr, Ipv4Addr, SocketAddr},
        path::PathBuf,
        str::FromStr,
        sync::Arc,
    },
    thiserror::Error,
};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CLUSTER: &str = "devnet";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Network the explorer links point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    Devnet,
    Mainnet,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::Mainnet => "mainnet",
        }
    }

    /// Solscan link for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &impl fmt::Display) -> String {
        format!("https://solscan.io/tx/{}?cluster={}", signature, self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(format!("unrecognized cluster {other:?}, expected devnet or mainnet")),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the server needs at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub rpc_url: String,
    pub bind_address: IpAddr,
    pub port: u16,
    /// Kept as given; it is only interpreted when building explorer links.
    pub cluster: String,
    /// Base58-encoded 64-byte secret key.
    pub private_key: Option<String>,
    /// JSON byte-array keypair file; takes precedence over `private_key`.
    pub keypair_path: Option<PathBuf>,
    pub curve: CurveDefaults,
    pub ledger: RpcLedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            cluster: DEFAULT_CLUSTER.to_string(),
            private_key: None,
            keypair_path: None,
            curve: CurveDefaults::default(),
            ledger: RpcLedgerConfig::default(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("cluster", &self.cluster)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("keypair_path", &self.keypair_path)
            .field("curve", &self.curve)
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl ServerConfig {
    /// A config suitable for tests: loopback, ephemeral port.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..Self::default()
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Parse from an argv-style iterator, falling back to the environment.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from_safe(args)?;
        Self::from_matches(&matches)
    }

    pub fn from_matches(matches: &ArgMatches<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut curve = defaults.curve.clone();
        if let Some(supply) = parsed::<u64>(matches, "total_supply")? {
            curve.total_token_supply = supply;
        }
        if let Some(pct) = parsed::<u8>(matches, "migration_supply_pct")? {
            curve.percentage_supply_on_migration = pct;
        }

        Ok(Self {
            rpc_url: matches
                .value_of("rpc_url")
                .map(str::to_string)
                .unwrap_or(defaults.rpc_url),
            bind_address: parsed(matches, "bind_address")?.unwrap_or(defaults.bind_address),
            port: parsed(matches, "port")?.unwrap_or(defaults.port),
            cluster: matches
                .value_of("cluster")
                .map(str::to_string)
                .unwrap_or(defaults.cluster),
            private_key: matches
                .value_of("private_key")
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string),
            keypair_path: matches.value_of("keypair").map(PathBuf::from),
            curve,
            ledger: defaults.ledger,
        })
    }

    /// The credential source selected by this config.
    pub fn signer_provider(&self) -> Arc<dyn SignerProvider> {
        match &self.keypair_path {
            Some(path) => Arc::new(KeypairFileSigner::new(path.clone())),
            None => Arc::new(Base58Signer::new(self.private_key.as_deref())),
        }
    }
}

fn parsed<T>(matches: &ArgMatches<'_>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    matches
        .value_of(name)
        .map(|value| {
            value.parse::<T>().map_err(|err| ConfigError::InvalidValue {
                name,
                value: value.to_string(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

/// Command-line definition.
pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::with_name("rpc_url")
                .long("rpc-url")
                .value_name("URL")
                .takes_value(true)
                .env("RPC_URL")
                .help("JSON-RPC endpoint of the Solana node [default: https://api.devnet.solana.com]"),
        )
        .arg(
            Arg::with_name("private_key")
                .long("private-key")
                .value_name("BASE58")
                .takes_value(true)
                .env("PRIVATE_KEY")
                .hide_env_values(true)
                .help("Base58-encoded secret key of the fee-paying wallet"),
        )
        .arg(
            Arg::with_name("keypair")
                .long("keypair")
                .value_name("PATH")
                .takes_value(true)
                .env("KEYPAIR_PATH")
                .help("Keypair file (JSON byte array); overrides --private-key"),
        )
        .arg(
            Arg::with_name("cluster")
                .long("cluster")
                .value_name("devnet|mainnet")
                .takes_value(true)
                .env("CLUSTER")
                .help("Network used for explorer links [default: devnet]"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .value_name("PORT")
                .takes_value(true)
                .env("PORT")
                .help("Listening port [default: 3000]"),
        )
        .arg(
            Arg::with_name("bind_address")
                .long("bind-address")
                .value_name("HOST")
                .takes_value(true)
                .env("BIND_ADDRESS")
                .help("Listening address [default: 0.0.0.0]"),
        )
        .arg(
            Arg::with_name("total_supply")
                .long("total-supply")
                .value_name("TOKENS")
                .takes_value(true)
                .env("TOTAL_TOKEN_SUPPLY")
                .help("Total supply of every launched token, in whole tokens [default: 1000000000]"),
        )
        .arg(
            Arg::with_name("migration_supply_pct")
                .long("migration-supply-pct")
                .value_name("PERCENT")
                .takes_value(true)
                .env("MIGRATION_SUPPLY_PERCENTAGE")
                .help("Share of supply reserved for migration [default: 10]"),
        )
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    #[test]
    fn cluster_parses_case_insensitively() {
        assert_eq!("DevNet".parse::<Cluster>().unwrap(), Cluster::Devnet);
        assert_eq!(" mainnet ".parse::<Cluster>().unwrap(), Cluster::Mainnet);
        assert!("testnet".parse::<Cluster>().is_err());
    }

    #[test]
    fn explorer_url_carries_cluster() {
        assert_eq!(
            Cluster::Devnet.explorer_tx_url(&"abc"),
            "https://solscan.io/tx/abc?cluster=devnet"
        );
        assert_eq!(
            Cluster::Mainnet.explorer_tx_url(&"abc"),
            "https://solscan.io/tx/abc?cluster=mainnet"
        );
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::from_args([
            "launchpad-server",
            "--rpc-url",
            "http://localhost:8899",
            "--port",
            "8080",
            "--cluster",
            "mainnet",
            "--total-supply",
            "500000000",
            "--migration-supply-pct",
            "20",
        ])
        .unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8899");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cluster, "mainnet");
        assert_eq!(config.curve.total_token_supply, 500_000_000);
        assert_eq!(config.curve.percentage_supply_on_migration, 20);
    }

    #[test]
    fn bad_port_is_reported() {
        assert_matches!(
            ServerConfig::from_args(["launchpad-server", "--port", "http"]),
            Err(ConfigError::InvalidValue { name: "port", .. })
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = ServerConfig {
            private_key: Some("super-secret".to_string()),
            ..ServerConfig::dev_default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
