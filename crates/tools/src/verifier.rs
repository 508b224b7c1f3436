//! Explorer source verification
//!
//! One verification request per deployed contract. The request carries the
//! standard-JSON compiler input from the contract's build-info, so imported
//! sources travel with it, together with the exact solc and zksolc versions.
//! The explorer answers with a request id; whether it later succeeds is not
//! tracked.

use alloy::primitives::{hex, Address, Bytes};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::artifact::Artifact;
use crate::config::CompilerSettings;
use crate::error::VerificationError;

/// Explorer-assigned id of a verification request
pub type VerificationId = u64;

/// `codeFormat` for multi-file sources
pub const STANDARD_JSON_INPUT: &str = "solidity-standard-json-input";

/// What the explorer needs to match source against on-chain code
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub address: Address,
    pub artifact: &'a Artifact,
    /// ABI-encoded constructor arguments, as deployed
    pub constructor_args: &'a Bytes,
}

/// Requests source verification from an explorer
#[async_trait]
pub trait VerificationRequester: Send + Sync {
    async fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerificationId, VerificationError>;
}

/// The parts of a hardhat-zksync build-info file verification needs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfo {
    solc_version: Option<String>,
    zksolc_version: Option<String>,
    input: Value,
    #[serde(default)]
    output: BuildInfoOutput,
}

#[derive(Debug, Default, Deserialize)]
struct BuildInfoOutput {
    zk_version: Option<String>,
}

impl BuildInfo {
    fn read(path: &Path) -> Result<Self, VerificationError> {
        let invalid = |reason: String| VerificationError::BuildInfo {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))
    }

    fn optimizer_enabled(&self) -> bool {
        self.input
            .pointer("/settings/optimizer/enabled")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationPayload {
    contract_address: Address,
    source_code: Value,
    code_format: &'static str,
    contract_name: String,
    compiler_solc_version: String,
    compiler_zksolc_version: String,
    optimization_used: bool,
    constructor_arguments: String,
}

/// The explorer lists zksolc releases as `v1.3.13`
fn zksolc_release(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

/// Client for the zkSync explorer `contract_verification` endpoint
#[derive(Debug, Clone)]
pub struct ExplorerVerifier {
    client: Client,
    endpoint: Url,
    compiler: CompilerSettings,
}

impl ExplorerVerifier {
    pub fn new(endpoint: Url, compiler: CompilerSettings) -> Result<Self, VerificationError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint,
            compiler,
        })
    }

    fn payload(
        &self,
        request: &VerificationRequest<'_>,
    ) -> Result<VerificationPayload, VerificationError> {
        let artifact = request.artifact;
        let path = artifact
            .build_info
            .as_deref()
            .ok_or_else(|| VerificationError::MissingBuildInfo(artifact.contract_name.clone()))?;
        let build_info = BuildInfo::read(path)?;

        // Explicit [compiler] versions win over build-info
        let solc = self
            .compiler
            .solc
            .clone()
            .or_else(|| build_info.solc_version.clone())
            .ok_or(VerificationError::UnknownCompilerVersion("solc"))?;
        let zksolc = self
            .compiler
            .zksolc
            .clone()
            .or_else(|| build_info.zksolc_version.clone())
            .or_else(|| build_info.output.zk_version.clone())
            .ok_or(VerificationError::UnknownCompilerVersion("zksolc"))?;

        Ok(VerificationPayload {
            contract_address: request.address,
            optimization_used: build_info.optimizer_enabled(),
            source_code: build_info.input,
            code_format: STANDARD_JSON_INPUT,
            contract_name: artifact.fully_qualified_name(),
            compiler_solc_version: solc,
            compiler_zksolc_version: zksolc_release(&zksolc),
            constructor_arguments: hex::encode_prefixed(request.constructor_args),
        })
    }
}

#[async_trait]
impl VerificationRequester for ExplorerVerifier {
    async fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerificationId, VerificationError> {
        let payload = self.payload(&request)?;
        debug!(
            address = %request.address,
            contract = %payload.contract_name,
            solc = %payload.compiler_solc_version,
            zksolc = %payload.compiler_zksolc_version,
            endpoint = %self.endpoint,
            "Requesting verification"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VerificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        parse_verification_id(&body)
    }
}

/// The explorer replies with a bare id, sometimes quoted
fn parse_verification_id(body: &str) -> Result<VerificationId, VerificationError> {
    body.trim()
        .trim_matches('"')
        .parse()
        .map_err(|_| VerificationError::InvalidResponse(body.to_string()))
}
