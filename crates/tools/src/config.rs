//! Multi-network deployment configuration
//!
//! This module provides typed, validated configuration for ZNS deployments.
//! Configuration is resolved in priority order:
//!
//! 1. Command-line overrides
//! 2. Environment variables (`NETWORK_URL`, `PRIVATE_KEY`, `FEE_TOKEN`, `DEPLOY_*`)
//! 3. deploy.toml profile selection
//! 4. Built-in network defaults
//!
//! # Examples
//!
//! ```rust,no_run
//! use zns_tools::config::{Config, Overrides};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(Overrides::default())?;
//! println!("Network: {}", config.network);
//! println!("RPC URL: {}", config.rpc_url);
//! # Ok(())
//! # }
//! ```

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::resolver::FeeTokenSource;
use crate::units::{self, DeploymentUnit, UnitSelection};

/// File name of the optional workspace configuration.
pub const CONFIG_FILE: &str = "deploy.toml";

/// Default directory of hardhat-zksync build output.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts-zk";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid network: {0}. Must be zksync-testnet, zksync-mainnet, or a profile in deploy.toml")]
    InvalidNetwork(String),

    #[error("PRIVATE_KEY not set!")]
    MissingPrivateKey,

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("FEE_TOKEN not set and network {0} has no L1 fee token to resolve")]
    MissingFeeToken(String),

    #[error("Invalid address in {field}: {value}")]
    InvalidAddress { field: String, value: String },

    #[error("Unknown deployment unit: {0}")]
    UnknownUnit(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Built-in rollup networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// zkSync Era testnet, settling on Goerli
    ZksyncTestnet,
    /// zkSync Era mainnet
    ZksyncMainnet,
}

impl Network {
    /// Get network as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::ZksyncTestnet => "zksync-testnet",
            Network::ZksyncMainnet => "zksync-mainnet",
        }
    }

    /// Get default RPC URL for this network
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::ZksyncTestnet => "https://zksync2-testnet.zksync.dev",
            Network::ZksyncMainnet => "https://zksync2-mainnet.zksync.io",
        }
    }

    /// Name or URL of the L1 network the rollup settles on
    pub fn parent_chain_network(&self) -> &'static str {
        match self {
            Network::ZksyncTestnet => "goerli",
            Network::ZksyncMainnet => "mainnet",
        }
    }

    /// Explorer endpoint accepting contract verification requests
    pub fn verify_url(&self) -> &'static str {
        match self {
            Network::ZksyncTestnet => {
                "https://zksync2-testnet-explorer.zksync.dev/contract_verification"
            }
            Network::ZksyncMainnet => {
                "https://zksync2-mainnet-explorer.zksync.io/contract_verification"
            }
        }
    }

    /// L1 USDC, whose L2 counterpart is the default fee token
    pub fn l1_fee_token(&self) -> Address {
        match self {
            Network::ZksyncTestnet => address!("d35cceead182dcee0f148ebac9447da2c4d449c4"),
            Network::ZksyncMainnet => address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
        }
    }

    /// Built-in profile for this network
    pub fn profile(&self) -> NetworkProfile {
        NetworkProfile {
            rpc_url: self.default_rpc_url().to_string(),
            parent_chain_network: self.parent_chain_network().to_string(),
            zksync: true,
            verify_url: self.verify_url().to_string(),
            l1_fee_token: Some(self.l1_fee_token()),
            description: None,
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zksync-testnet" | "zksynctestnet" => Ok(Network::ZksyncTestnet),
            "zksync-mainnet" | "zksyncmainnet" => Ok(Network::ZksyncMainnet),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Network profile, either built-in or from deploy.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub rpc_url: String,
    pub parent_chain_network: String,
    #[serde(default = "default_true")]
    pub zksync: bool,
    pub verify_url: String,
    #[serde(default)]
    pub l1_fee_token: Option<Address>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Compiler versions reported to the explorer on verification
///
/// Unset versions are read from each contract's build-info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    #[serde(default)]
    pub solc: Option<String>,
    #[serde(default)]
    pub zksolc: Option<String>,
}

impl CompilerSettings {
    /// The explorer only accepts concrete releases
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, version) in [("solc", &self.solc), ("zksolc", &self.zksolc)] {
            if let Some(version) = version {
                if version.trim().is_empty() || version.eq_ignore_ascii_case("latest") {
                    return Err(ConfigError::ValidationError(format!(
                        "compiler.{} must be a concrete version, got {:?}",
                        field, version
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Complete deploy.toml contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployToml {
    #[serde(default)]
    pub default: Option<DefaultProfile>,
    #[serde(default)]
    pub profile: HashMap<String, NetworkProfile>,
    #[serde(default, rename = "unit")]
    pub units: Vec<DeploymentUnit>,
    #[serde(default)]
    pub compiler: Option<CompilerSettings>,
}

/// Default section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultProfile {
    pub network: Option<String>,
    #[serde(default)]
    pub units: Option<Vec<String>>,
    pub artifacts: Option<PathBuf>,
}

/// Values given on the command line; they win over every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub network: Option<String>,
    pub units: Vec<String>,
    pub all_units: bool,
    pub artifacts_dir: Option<PathBuf>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Active network profile name
    pub network: String,
    /// Active network profile
    pub profile: NetworkProfile,
    /// Destination RPC endpoint
    pub rpc_url: Url,
    /// Explorer verification endpoint
    pub verify_url: Url,
    /// Deployer credential, checked before any deployment
    private_key: Option<String>,
    /// FEE_TOKEN override
    pub fee_token_override: Option<Address>,
    /// Directory with compiled artifacts
    pub artifacts_dir: PathBuf,
    /// Units to deploy
    pub selection: UnitSelection,
    /// Declared units: the built-in catalog merged with deploy.toml entries
    pub catalog: Vec<DeploymentUnit>,
    /// Compiler versions for verification
    pub compiler: CompilerSettings,
}

impl Config {
    /// Load configuration from environment and deploy.toml
    ///
    /// # Resolution Order
    ///
    /// 1. Load `.env` if present
    /// 2. Load deploy.toml if it exists
    /// 3. Overlay env vars, then command-line overrides
    /// 4. Validate required fields
    ///
    /// A missing `PRIVATE_KEY` is not an error here; deployments check it
    /// through [`Config::require_private_key`].
    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        // Load .env file if it exists (non-fatal)
        let _ = dotenvy::dotenv();

        let toml = Self::load_toml(Path::new(CONFIG_FILE))?;
        Self::from_sources(|key| std::env::var(key).ok(), toml, overrides)
    }

    /// Resolve configuration from an environment lookup and parsed TOML
    pub fn from_sources<F>(
        lookup: F,
        toml: Option<DeployToml>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty env values count as unset
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let toml = toml.unwrap_or_default();
        let defaults = toml.default.clone().unwrap_or_default();

        let network = overrides
            .network
            .or_else(|| env("DEPLOY_NETWORK"))
            .or_else(|| defaults.network.clone())
            .unwrap_or_else(|| Network::ZksyncTestnet.to_string());

        let profile = match toml.profile.get(network.as_str()) {
            Some(profile) => profile.clone(),
            None => Network::from_str(&network)?.profile(),
        };

        let rpc_url = env("NETWORK_URL").unwrap_or_else(|| profile.rpc_url.clone());
        let rpc_url = Self::validate_url("NETWORK_URL", &rpc_url)?;
        let verify_url = Self::validate_url("verify_url", &profile.verify_url)?;

        let private_key = env("PRIVATE_KEY");

        let fee_token_override = env("FEE_TOKEN")
            .map(|value| {
                value
                    .trim()
                    .parse::<Address>()
                    .map_err(|_| ConfigError::InvalidAddress {
                        field: "FEE_TOKEN".to_string(),
                        value,
                    })
            })
            .transpose()?;

        let artifacts_dir = overrides
            .artifacts_dir
            .or_else(|| env("ARTIFACTS_DIR").map(PathBuf::from))
            .or_else(|| defaults.artifacts.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR));

        let selection = if overrides.all_units {
            UnitSelection::All
        } else if !overrides.units.is_empty() {
            UnitSelection::Named(overrides.units)
        } else if let Some(names) = env("DEPLOY_UNITS") {
            UnitSelection::parse_list(&names)
        } else if let Some(names) = defaults.units.clone() {
            UnitSelection::Named(names)
        } else {
            UnitSelection::Default
        };

        let catalog = units::merge_catalog(units::builtin_catalog(), toml.units);
        let compiler = toml.compiler.unwrap_or_default();
        compiler.validate()?;

        let config = Config {
            network,
            profile,
            rpc_url,
            verify_url,
            private_key,
            fee_token_override,
            artifacts_dir,
            selection,
            catalog,
            compiler,
        };

        // Surface unknown unit names at load time, not mid-run
        config.selected_units()?;
        Ok(config)
    }

    /// Load deploy.toml; a missing file is not an error
    pub fn load_toml(path: &Path) -> Result<Option<DeployToml>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Deployer credential; absent or empty is fatal
    pub fn require_private_key(&self) -> Result<&str, ConfigError> {
        self.private_key
            .as_deref()
            .ok_or(ConfigError::MissingPrivateKey)
    }

    /// Two-source fee-token configuration for this network
    pub fn fee_token_source(&self) -> FeeTokenSource {
        FeeTokenSource {
            network: self.network.clone(),
            override_token: self.fee_token_override,
            l1_token: self.profile.l1_fee_token,
        }
    }

    /// Units picked by the active selection, in deployment order
    pub fn selected_units(&self) -> Result<Vec<DeploymentUnit>, ConfigError> {
        self.selection.select(&self.catalog)
    }

    /// Validate a URL value
    fn validate_url(field: &str, value: &str) -> Result<Url, ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }

        // Validate RPC URL format
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{} must start with http:// or https://: {}",
                field, value
            )));
        }

        Url::parse(value)
            .map_err(|e| ConfigError::ValidationError(format!("{}: {}: {}", field, value, e)))
    }

    /// Print the resolved configuration
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════════╗");
        println!("║           ZNS DEPLOYMENT CONFIGURATION RESOLVED                ║");
        println!("╚════════════════════════════════════════════════════════════════╝");
        println!("  Network:             {}", self.network);
        println!("  RPC URL:             {}", self.rpc_url);
        println!("  Parent Chain:        {}", self.profile.parent_chain_network);
        println!("  Verify URL:          {}", self.verify_url);

        match self.private_key {
            Some(_) => println!("  Deployer Key:        (configured)"),
            None => println!("  Deployer Key:        (not configured)"),
        }

        match (self.fee_token_override, self.profile.l1_fee_token) {
            (Some(token), _) => println!("  Fee Token:           {} (FEE_TOKEN)", token),
            (None, Some(l1)) => println!("  Fee Token:           resolved from L1 {}", l1),
            (None, None) => println!("  Fee Token:           (not configured)"),
        }

        println!("  Artifacts:           {}", self.artifacts_dir.display());
        println!("  Units:               {}", self.selection);
        println!(
            "  Compiler:            solc {} / zksolc {}",
            self.compiler.solc.as_deref().unwrap_or("(build-info)"),
            self.compiler.zksolc.as_deref().unwrap_or("(build-info)")
        );

        if !self.profile.zksync {
            println!("  zkSync Mode:         DISABLED");
        }

        println!("╚════════════════════════════════════════════════════════════════╝");
    }

    /// Get configuration as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// Manual Serialize impl so the private key never leaves the process
impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(9))?;
        map.serialize_entry("network", &self.network)?;
        map.serialize_entry("rpc_url", self.rpc_url.as_str())?;
        map.serialize_entry("parent_chain_network", &self.profile.parent_chain_network)?;
        map.serialize_entry("verify_url", self.verify_url.as_str())?;
        map.serialize_entry("private_key_configured", &self.private_key.is_some())?;
        map.serialize_entry("fee_token", &self.fee_token_override)?;
        map.serialize_entry("artifacts_dir", &self.artifacts_dir)?;
        map.serialize_entry("units", &self.selection.to_string())?;
        map.serialize_entry("compiler", &self.compiler)?;
        map.end()
    }
}
