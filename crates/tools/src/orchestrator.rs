//! Deployment orchestration
//!
//! [`DeploymentPlan::prepare`] performs every fatal check (credential, fee
//! token) before anything touches the chain. [`DeploymentOrchestrator::run`]
//! then walks the units in order: load artifact, encode constructor, deploy,
//! verify. A unit's failure is recorded in its [`DeploymentResult`] and the
//! next unit runs regardless. Nothing is persisted between runs, so running
//! again redeploys every unit.

use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactLoader};
use crate::config::Config;
use crate::deployer::{self, ContractDeployer, DeployRequest, Deployment};
use crate::error::{SetupError, UnitError};
use crate::logging;
use crate::resolver::AddressResolver;
use crate::units::DeploymentUnit;
use crate::verifier::{VerificationId, VerificationRequest, VerificationRequester};

/// Values shared by every unit of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    pub network: String,
    pub fee_token: Address,
}

/// Everything a run needs, established before the first deployment
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub units: Vec<DeploymentUnit>,
    pub context: DeploymentContext,
    pub signer: PrivateKeySigner,
}

impl DeploymentPlan {
    /// Run the fatal setup checks in order: credential, unit selection, fee token.
    ///
    /// The fee token is resolved once and substituted into `$FEE_TOKEN`
    /// arguments.
    pub async fn prepare(
        config: &Config,
        resolver: &dyn AddressResolver,
    ) -> Result<Self, SetupError> {
        let signer = deployer::parse_signer(config.require_private_key()?)?;
        let units = config.selected_units()?;
        let fee_token = config.fee_token_source().resolve(resolver).await?;

        Ok(Self {
            units: units
                .into_iter()
                .map(|unit| unit.with_fee_token(fee_token))
                .collect(),
            context: DeploymentContext {
                network: config.network.clone(),
                fee_token,
            },
            signer,
        })
    }
}

/// How the explorer answered for a deployed unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The unit never reached deployment
    NotAttempted,
    Requested(VerificationId),
    Failed(String),
}

/// Outcome of one unit
#[derive(Debug)]
pub struct DeploymentResult {
    pub unit: DeploymentUnit,
    pub address: Option<Address>,
    pub tx_hash: Option<B256>,
    /// ABI-encoded constructor arguments, kept for diagnostics
    pub encoded_constructor: Option<Bytes>,
    pub verification: VerificationOutcome,
    pub error: Option<UnitError>,
}

impl DeploymentResult {
    fn failed(unit: DeploymentUnit, error: UnitError) -> Self {
        Self {
            unit,
            address: None,
            tx_hash: None,
            encoded_constructor: None,
            verification: VerificationOutcome::NotAttempted,
            error: Some(error),
        }
    }

    pub fn is_deployed(&self) -> bool {
        self.address.is_some()
    }
}

/// Per-unit pipeline over pluggable collaborators
pub struct DeploymentOrchestrator {
    artifacts: Arc<dyn ArtifactLoader>,
    deployer: Arc<dyn ContractDeployer>,
    verifier: Arc<dyn VerificationRequester>,
}

impl DeploymentOrchestrator {
    pub fn new(
        artifacts: Arc<dyn ArtifactLoader>,
        deployer: Arc<dyn ContractDeployer>,
        verifier: Arc<dyn VerificationRequester>,
    ) -> Self {
        Self {
            artifacts,
            deployer,
            verifier,
        }
    }

    /// Deploy `units` in order, one at a time; always yields one result per unit
    pub async fn run(
        &self,
        units: &[DeploymentUnit],
        context: &DeploymentContext,
    ) -> Vec<DeploymentResult> {
        let total = units.len();
        let mut results = Vec::with_capacity(total);
        for (index, unit) in units.iter().enumerate() {
            logging::unit_started(&unit.name, &context.network, index + 1, total);
            results.push(self.run_unit(unit, context).await);
        }
        results
    }

    async fn run_unit(&self, unit: &DeploymentUnit, context: &DeploymentContext) -> DeploymentResult {
        let (artifact, constructor_args, deployment) = match self.deploy_unit(unit, context).await {
            Ok(deployed) => deployed,
            Err(error) => {
                logging::unit_failed(&unit.name, &error);
                return DeploymentResult::failed(unit.clone(), error);
            }
        };

        logging::unit_deployed(
            &artifact.contract_name,
            deployment.address,
            deployment.tx_hash,
            &constructor_args,
        );

        let verification = match self
            .verifier
            .verify(VerificationRequest {
                address: deployment.address,
                artifact: &artifact,
                constructor_args: &constructor_args,
            })
            .await
        {
            Ok(id) => {
                logging::verification_requested(&artifact.contract_name, deployment.address, id);
                VerificationOutcome::Requested(id)
            }
            Err(error) => {
                logging::verification_failed(&artifact.contract_name, deployment.address, &error);
                VerificationOutcome::Failed(error.to_string())
            }
        };

        DeploymentResult {
            unit: unit.clone(),
            address: Some(deployment.address),
            tx_hash: Some(deployment.tx_hash),
            encoded_constructor: Some(constructor_args),
            verification,
            error: None,
        }
    }

    async fn deploy_unit(
        &self,
        unit: &DeploymentUnit,
        context: &DeploymentContext,
    ) -> Result<(Artifact, Bytes, Deployment), UnitError> {
        let artifact = self.artifacts.load(&unit.name)?;
        let constructor_args = deployer::encode_constructor(&artifact, &unit.args)?;
        let deployment = self
            .deployer
            .deploy(DeployRequest {
                artifact: &artifact,
                constructor_args: &constructor_args,
                fee_token: context.fee_token,
            })
            .await?;
        Ok((artifact, constructor_args, deployment))
    }
}

/// Counts over a run's results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub deployed: usize,
    pub verification_requested: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[DeploymentResult]) -> Self {
        results.iter().fold(Self::default(), |summary, result| Self {
            attempted: summary.attempted + 1,
            deployed: summary.deployed + usize::from(result.is_deployed()),
            verification_requested: summary.verification_requested
                + usize::from(matches!(
                    result.verification,
                    VerificationOutcome::Requested(_)
                )),
            failed: summary.failed + usize::from(result.error.is_some()),
        })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted, {} deployed, {} verification requested, {} failed",
            self.attempted, self.deployed, self.verification_requested, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use crate::error::{ArtifactError, ConfigError};
    use crate::test_utils::{
        artifact_with_abi, config_with_env, LogCapture, MockArtifacts, MockDeployer,
        MockResolver, MockVerifier,
    };
    use crate::units::{ConstructorArg, FEE_TOKEN_PLACEHOLDER};
    use alloy::primitives::address;

    const FEE_TOKEN: Address = address!("0000000000000000000000000000000000000fee");
    const PRIVATE_KEY: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    fn context() -> DeploymentContext {
        DeploymentContext {
            network: "zksync-testnet".to_string(),
            fee_token: FEE_TOKEN,
        }
    }

    fn unit(name: &str, args: Vec<ConstructorArg>) -> DeploymentUnit {
        DeploymentUnit::new(name, args)
    }

    struct Harness {
        artifacts: Arc<MockArtifacts>,
        deployer: Arc<MockDeployer>,
        verifier: Arc<MockVerifier>,
    }

    impl Harness {
        fn new(artifacts: MockArtifacts, deployer: MockDeployer, verifier: MockVerifier) -> Self {
            Self {
                artifacts: Arc::new(artifacts),
                deployer: Arc::new(deployer),
                verifier: Arc::new(verifier),
            }
        }

        fn orchestrator(&self) -> DeploymentOrchestrator {
            DeploymentOrchestrator::new(
                self.artifacts.clone(),
                self.deployer.clone(),
                self.verifier.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_isolated() {
        let two_uint_abi = r#"[{"type": "constructor", "stateMutability": "nonpayable", "inputs": [
            {"name": "a", "type": "uint256"}, {"name": "b", "type": "uint256"}
        ]}]"#;
        let harness = Harness::new(
            MockArtifacts::with(vec![
                artifact_with_abi("A", "[]"),
                artifact_with_abi("C", two_uint_abi),
            ]),
            MockDeployer::default(),
            MockVerifier::default(),
        );
        let units = vec![
            unit("A", vec![]),
            unit("B", vec![ConstructorArg::Int(1), ConstructorArg::Int(2)]),
            unit("C", vec![ConstructorArg::Int(1), ConstructorArg::Int(2)]),
        ];

        let results = harness.orchestrator().run(&units, &context()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(harness.artifacts.requested(), vec!["A", "B", "C"]);

        let a = &results[0];
        assert!(a.address.is_some());
        assert!(a.error.is_none());
        assert!(matches!(a.verification, VerificationOutcome::Requested(_)));

        let b = &results[1];
        assert_eq!(b.unit.name, "B");
        assert!(b.address.is_none());
        assert_eq!(b.verification, VerificationOutcome::NotAttempted);
        assert!(matches!(
            b.error,
            Some(UnitError::Artifact(ArtifactError::NotFound { .. }))
        ));

        assert!(results[2].is_deployed());
        assert_eq!(harness.deployer.deployed(), vec!["A", "C"]);
        assert_eq!(harness.verifier.verified(), vec!["A", "C"]);

        let summary = RunSummary::from_results(&results);
        assert_eq!(
            summary,
            RunSummary {
                attempted: 3,
                deployed: 2,
                verification_requested: 2,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_every_unit_attempted_despite_failures() {
        let names = ["A", "B", "C", "D", "E"];
        let harness = Harness::new(
            MockArtifacts::with(names.iter().map(|n| artifact_with_abi(n, "[]")).collect()),
            MockDeployer::failing_for(&["A", "C", "E"]),
            MockVerifier::default(),
        );
        let units: Vec<_> = names.iter().map(|n| unit(n, vec![])).collect();

        let results = harness.orchestrator().run(&units, &context()).await;

        assert_eq!(results.len(), names.len());
        assert_eq!(harness.deployer.attempts(), names.len());
        let deployed: Vec<_> = results
            .iter()
            .filter(|r| r.is_deployed())
            .map(|r| r.unit.name.as_str())
            .collect();
        assert_eq!(deployed, vec!["B", "D"]);
        assert!(matches!(results[0].error, Some(UnitError::Deploy(_))));
    }

    #[tokio::test]
    async fn test_verification_failure_keeps_address() {
        let harness = Harness::new(
            MockArtifacts::with(vec![artifact_with_abi("A", "[]")]),
            MockDeployer::default(),
            MockVerifier::failing(),
        );

        let results = harness
            .orchestrator()
            .run(&[unit("A", vec![])], &context())
            .await;

        let result = &results[0];
        assert_eq!(result.address, Some(MockDeployer::address_for(0)));
        assert!(result.error.is_none());
        assert!(matches!(result.verification, VerificationOutcome::Failed(_)));

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.deployed, 1);
        assert_eq!(summary.verification_requested, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_bad_arguments_fail_before_deploy() {
        let harness = Harness::new(
            MockArtifacts::with(vec![artifact_with_abi("A", "[]")]),
            MockDeployer::default(),
            MockVerifier::default(),
        );

        let results = harness
            .orchestrator()
            .run(&[unit("A", vec![ConstructorArg::Int(1)])], &context())
            .await;

        assert!(matches!(results[0].error, Some(UnitError::Deploy(_))));
        assert_eq!(harness.deployer.attempts(), 0);
        assert!(harness.verifier.verified().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_redeploys_everything() {
        let harness = Harness::new(
            MockArtifacts::with(vec![artifact_with_abi("A", "[]")]),
            MockDeployer::default(),
            MockVerifier::default(),
        );
        let units = vec![unit("A", vec![]), unit("Missing", vec![])];
        let orchestrator = harness.orchestrator();

        let first = orchestrator.run(&units, &context()).await;
        let second = orchestrator.run(&units, &context()).await;

        assert_eq!(harness.deployer.deployed(), vec!["A", "A"]);
        assert_eq!(harness.artifacts.requested(), vec!["A", "Missing", "A", "Missing"]);
        assert_ne!(first[0].address, second[0].address);
    }

    #[tokio::test]
    async fn test_fee_token_reaches_deployer() {
        let harness = Harness::new(
            MockArtifacts::with(vec![artifact_with_abi("A", "[]")]),
            MockDeployer::default(),
            MockVerifier::default(),
        );

        harness
            .orchestrator()
            .run(&[unit("A", vec![])], &context())
            .await;

        assert_eq!(harness.deployer.fee_tokens(), vec![FEE_TOKEN]);
    }

    #[tokio::test]
    async fn test_unit_logs_carry_network() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let harness = Harness::new(
            MockArtifacts::with(vec![artifact_with_abi("A", "[]")]),
            MockDeployer::default(),
            MockVerifier::default(),
        );

        harness
            .orchestrator()
            .run(&[unit("A", vec![])], &context())
            .await;

        let logs = capture.contents();
        let started = logs
            .lines()
            .find(|line| line.contains("Deploying contract"))
            .unwrap();
        assert!(started.contains("network"));
        assert!(started.contains("zksync-testnet"));
    }

    #[tokio::test]
    async fn test_prepare_requires_credential_before_resolution() {
        let config = config_with_env(&[], Overrides::default());
        let resolver = MockResolver::returning(FEE_TOKEN);

        let err = DeploymentPlan::prepare(&config, &resolver).await.unwrap_err();

        assert!(matches!(
            err,
            SetupError::Config(ConfigError::MissingPrivateKey)
        ));
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_prepare_aborts_when_resolution_fails() {
        let config = config_with_env(&[("PRIVATE_KEY", PRIVATE_KEY)], Overrides::default());
        let resolver = MockResolver::failing();

        let err = DeploymentPlan::prepare(&config, &resolver).await.unwrap_err();
        assert!(matches!(err, SetupError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_prepare_uses_override_and_fills_placeholders() {
        let override_token = "0x0000000000000000000000000000000000000abc";
        let mut config = config_with_env(
            &[("PRIVATE_KEY", PRIVATE_KEY), ("FEE_TOKEN", override_token)],
            Overrides::default(),
        );
        config.catalog.push(unit("FeeVault", vec![FEE_TOKEN_PLACEHOLDER.into()]));
        config.selection = crate::units::UnitSelection::Named(vec!["FeeVault".to_string()]);
        let resolver = MockResolver::failing();

        let plan = DeploymentPlan::prepare(&config, &resolver).await.unwrap();

        let expected: Address = override_token.parse().unwrap();
        assert_eq!(plan.context.fee_token, expected);
        assert_eq!(plan.units[0].args, vec![ConstructorArg::Address(expected)]);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_prepare_resolves_default_fee_token() {
        let config = config_with_env(&[("PRIVATE_KEY", PRIVATE_KEY)], Overrides::default());
        let resolver = MockResolver::returning(FEE_TOKEN);

        let plan = DeploymentPlan::prepare(&config, &resolver).await.unwrap();

        assert_eq!(plan.context.fee_token, FEE_TOKEN);
        assert_eq!(plan.units.len(), 1);
        assert_eq!(resolver.requested(), vec![config.profile.l1_fee_token.unwrap()]);
    }
}
