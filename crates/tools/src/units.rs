//! Deployment unit declarations and selection
//!
//! A unit names one contract artifact and its constructor arguments. The
//! built-in catalog lists the ZNS suite in dependency order; deploy.toml may
//! add units or replace catalog entries by name. Which units a run deploys is
//! an explicit [`UnitSelection`].

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

/// Argument placeholder replaced by the resolved fee token before a run.
pub const FEE_TOKEN_PLACEHOLDER: &str = "$FEE_TOKEN";

/// Units deployed when nothing else is selected.
pub const DEFAULT_UNITS: &[&str] = &["ZNSRegistrarController"];

/// Registry address ReverseRecords points at on the testnet.
const TESTNET_ZNS_REGISTRY: Address = address!("9cfBa9b6308c135E47E0073AC0733B3C8c7D5414");

/// Type-erased constructor argument.
///
/// Arguments are coerced to the constructor's ABI types at encoding time, so
/// a `Text` value may end up as bytes, a string or a large integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstructorArg {
    Bool(bool),
    Int(i64),
    Address(Address),
    Text(String),
}

impl ConstructorArg {
    pub fn is_fee_token_placeholder(&self) -> bool {
        matches!(self, ConstructorArg::Text(text) if text == FEE_TOKEN_PLACEHOLDER)
    }
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::Bool(value) => write!(f, "{}", value),
            ConstructorArg::Int(value) => write!(f, "{}", value),
            ConstructorArg::Address(value) => write!(f, "{}", value),
            ConstructorArg::Text(value) => f.write_str(value),
        }
    }
}

impl From<Address> for ConstructorArg {
    fn from(value: Address) -> Self {
        ConstructorArg::Address(value)
    }
}

impl From<i64> for ConstructorArg {
    fn from(value: i64) -> Self {
        ConstructorArg::Int(value)
    }
}

impl From<&str> for ConstructorArg {
    fn from(value: &str) -> Self {
        ConstructorArg::Text(value.to_string())
    }
}

/// One contract to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    /// Artifact name of the contract
    pub name: String,
    /// Constructor arguments in declaration order
    #[serde(default)]
    pub args: Vec<ConstructorArg>,
}

impl DeploymentUnit {
    pub fn new(name: impl Into<String>, args: Vec<ConstructorArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Replace `$FEE_TOKEN` arguments with the resolved address
    pub fn with_fee_token(mut self, fee_token: Address) -> Self {
        for arg in self.args.iter_mut() {
            if arg.is_fee_token_placeholder() {
                *arg = ConstructorArg::Address(fee_token);
            }
        }
        self
    }
}

/// The ZNS contracts in the order they depend on each other
pub fn builtin_catalog() -> Vec<DeploymentUnit> {
    vec![
        DeploymentUnit::new("ZNSRegistry", vec![]),
        DeploymentUnit::new(
            "BaseRegistrarImplementation",
            vec![
                address!("4d4c47E19D9E6BB59B3141908C2D9165018199b3").into(),
                address!("a416AE937AaC9Dc6f31f80f8cFEE897F837c8BE6").into(),
                "0x".into(),
            ],
        ),
        DeploymentUnit::new("ZNSRegistrarController", vec![]),
        DeploymentUnit::new("PublicResolver", vec![]),
        DeploymentUnit::new("ReverseRegistrar", vec![]),
        DeploymentUnit::new("StablePriceOracle", vec![]),
        DeploymentUnit::new("TokenURIBuilder", vec![]),
        DeploymentUnit::new("__AdminUpgradeabilityProxy__", vec![]),
        // mainnet registry differs; override this unit in deploy.toml there
        DeploymentUnit::new("ReverseRecords", vec![TESTNET_ZNS_REGISTRY.into()]),
    ]
}

/// Overlay declared units on the catalog.
///
/// A declared unit with a catalog name replaces that entry in place; new
/// names are appended in declaration order.
pub fn merge_catalog(
    mut catalog: Vec<DeploymentUnit>,
    declared: Vec<DeploymentUnit>,
) -> Vec<DeploymentUnit> {
    for unit in declared {
        match catalog.iter_mut().find(|existing| existing.name == unit.name) {
            Some(existing) => *existing = unit,
            None => catalog.push(unit),
        }
    }
    catalog
}

/// Which catalog units a run deploys
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnitSelection {
    /// [`DEFAULT_UNITS`]
    #[default]
    Default,
    /// Every catalog unit, in catalog order
    All,
    /// The named units, in the given order
    Named(Vec<String>),
}

impl UnitSelection {
    /// Parse a comma-separated list such as `DEPLOY_UNITS`; `all` selects everything
    pub fn parse_list(list: &str) -> Self {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        match names.as_slice() {
            [] => UnitSelection::Default,
            [only] if only.eq_ignore_ascii_case("all") => UnitSelection::All,
            _ => UnitSelection::Named(names),
        }
    }

    /// Pick units from the catalog
    pub fn select(&self, catalog: &[DeploymentUnit]) -> Result<Vec<DeploymentUnit>, ConfigError> {
        let lookup = |name: &str| {
            if name.is_empty() {
                return Err(ConfigError::MissingField("unit name".to_string()));
            }
            catalog
                .iter()
                .find(|unit| unit.name == name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownUnit(name.to_string()))
        };

        match self {
            UnitSelection::Default => DEFAULT_UNITS.iter().map(|name| lookup(*name)).collect(),
            UnitSelection::All => Ok(catalog.to_vec()),
            UnitSelection::Named(names) => names.iter().map(|name| lookup(name.as_str())).collect(),
        }
    }
}

impl fmt::Display for UnitSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSelection::Default => write!(f, "{} (default)", DEFAULT_UNITS.join(", ")),
            UnitSelection::All => f.write_str("all"),
            UnitSelection::Named(names) => f.write_str(&names.join(", ")),
        }
    }
}
