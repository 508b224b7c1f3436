//! ZNS Tools Library
//!
//! Deploys the ZNS contract suite to a zkSync rollup: configuration, unit
//! selection, fee-token resolution, artifact loading, deployment and explorer
//! verification.

pub mod artifact;
pub mod config;
pub mod deployer;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod resolver;
pub mod units;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Config, ConfigError, Network, Overrides};
pub use orchestrator::{
    DeploymentContext, DeploymentOrchestrator, DeploymentPlan, DeploymentResult, RunSummary,
    VerificationOutcome,
};
pub use units::{DeploymentUnit, UnitSelection};
