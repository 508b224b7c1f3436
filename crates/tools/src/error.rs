//! Error types for the deployment pipeline
//!
//! Setup errors ([`SetupError`]) abort a run before any unit is attempted.
//! Everything else is scoped to one unit and ends up in that unit's
//! [`DeploymentResult`](crate::orchestrator::DeploymentResult).

use alloy::primitives::{Address, B256};
use std::path::PathBuf;
use thiserror::Error;

pub use crate::config::ConfigError;

/// Fatal errors raised before the first deployment
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Fee token resolution failed: {0}")]
    Resolution(#[from] ResolutionError),
}

/// Cross-layer address lookup failures
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Provider unreachable: {0}")]
    Provider(String),

    #[error("Network reports no default L2 ERC20 bridge")]
    NoDefaultBridge,

    #[error("Bridge call failed: {0}")]
    Bridge(String),

    #[error("Token {0} has no L2 counterpart")]
    NoCounterpart(Address),
}

/// Artifact lookup and parsing failures
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact for contract {name} not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("Contract name {name} is ambiguous: {} artifacts match", candidates.len())]
    Ambiguous {
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("Contract {0} has no deployable bytecode")]
    EmptyBytecode(String),
}

/// Deployment transaction failures
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid constructor arguments for {contract}: {reason}")]
    Arguments { contract: String, reason: String },

    #[error("Bytecode of {contract} cannot be deployed: {reason}")]
    Bytecode { contract: String, reason: String },

    #[error("Failed to send deployment transaction: {0}")]
    Send(String),

    #[error("Failed to confirm deployment transaction: {0}")]
    Confirmation(String),

    #[error("Deployment transaction {0} reverted")]
    Reverted(B256),

    #[error("No contract address in receipt of {0}")]
    NoContractAddress(B256),
}

/// Explorer verification failures
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No build-info for {0}; recompile with hardhat-zksync")]
    MissingBuildInfo(String),

    #[error("Invalid build-info {}: {reason}", path.display())]
    BuildInfo { path: PathBuf, reason: String },

    #[error("Unknown {0} version; set it under [compiler] in deploy.toml")]
    UnknownCompilerVersion(&'static str),

    #[error("Explorer rejected verification ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid explorer response: {0}")]
    InvalidResponse(String),
}

/// Failure of a single unit's pipeline
#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}
