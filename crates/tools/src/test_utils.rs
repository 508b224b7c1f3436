//! Shared fixtures and collaborator mocks for unit tests

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::io;
use std::sync::{Arc, Mutex};

use crate::artifact::{Artifact, ArtifactLoader};
use crate::config::{Config, Overrides};
use crate::deployer::{ContractDeployer, DeployRequest, Deployment};
use crate::error::{ArtifactError, DeployError, ResolutionError, VerificationError};
use crate::resolver::AddressResolver;
use crate::verifier::{VerificationId, VerificationRequest, VerificationRequester};

/// Config resolved from the given env pairs and no deploy.toml
pub fn config_with_env(pairs: &[(&str, &str)], overrides: Overrides) -> Config {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_sources(|key| env.get(key).cloned(), None, overrides).unwrap()
}

/// In-memory artifact with a `0x6080` bytecode stub
pub fn artifact_with_abi(name: &str, abi_json: &str) -> Artifact {
    Artifact {
        contract_name: name.to_string(),
        source_name: format!("contracts/{}.sol", name),
        abi: serde_json::from_str::<JsonAbi>(abi_json).unwrap(),
        bytecode: Bytes::from(vec![0x60, 0x80]),
        build_info: None,
    }
}

/// Write a hardhat artifact at `root/<source_name>/<name>.json`
pub fn write_artifact(root: &Path, source_name: &str, name: &str, abi_json: &str, bytecode: &str) {
    let dir = root.join(source_name);
    fs::create_dir_all(&dir).unwrap();
    let body = format!(
        r#"{{"_format": "hh-zksolc-artifact-1", "contractName": "{}", "sourceName": "{}", "abi": {}, "bytecode": "{}"}}"#,
        name, source_name, abi_json, bytecode
    );
    fs::write(dir.join(format!("{}.json", name)), body).unwrap();
}

/// Write `<name>.dbg.json` pointing at `build_info`, relative to the artifact dir
pub fn write_debug_file(root: &Path, source_name: &str, name: &str, build_info: &str) {
    let dir = root.join(source_name);
    fs::create_dir_all(&dir).unwrap();
    let body = json!({ "_format": "hh-sol-dbg-1", "buildInfo": build_info });
    fs::write(dir.join(format!("{}.dbg.json", name)), body.to_string()).unwrap();
}

/// Write a hardhat-zksync build-info at `root/build-info/<id>.json`
pub fn write_build_info(
    root: &Path,
    id: &str,
    solc: &str,
    zk_version: Option<&str>,
    sources: &[(&str, &str)],
    contracts: &[(&str, &str)],
) -> PathBuf {
    let dir = root.join("build-info");
    fs::create_dir_all(&dir).unwrap();

    let sources: Map<String, Value> = sources
        .iter()
        .map(|(path, content)| (path.to_string(), json!({ "content": content })))
        .collect();
    let mut output_contracts = Map::new();
    for (source, name) in contracts {
        let entry = output_contracts
            .entry(source.to_string())
            .or_insert_with(|| json!({}));
        entry[*name] = json!({ "abi": [] });
    }

    let mut output = json!({ "contracts": output_contracts });
    if let Some(version) = zk_version {
        output["zk_version"] = json!(version);
    }
    let body = json!({
        "_format": "hh-zksolc-build-info-1",
        "id": id,
        "solcVersion": solc,
        "input": {
            "language": "Solidity",
            "sources": sources,
            "settings": { "optimizer": { "enabled": true, "mode": "3" } },
        },
        "output": output,
    });

    let path = dir.join(format!("{}.json", id));
    fs::write(&path, body.to_string()).unwrap();
    path
}

/// In-memory sink for `tracing` output
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Plain-text subscriber writing into this capture
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Resolver answering with a fixed address, or always failing
pub struct MockResolver {
    answer: Option<Address>,
    requested: Mutex<Vec<Address>>,
}

impl MockResolver {
    pub fn returning(answer: Address) -> Self {
        Self {
            answer: Some(answer),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requested(&self) -> Vec<Address> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressResolver for MockResolver {
    async fn resolve(&self, source: Address) -> Result<Address, ResolutionError> {
        self.requested.lock().unwrap().push(source);
        self.answer
            .ok_or_else(|| ResolutionError::Provider("connection refused".to_string()))
    }
}

/// Artifact store keyed by contract name; records every lookup
pub struct MockArtifacts {
    artifacts: HashMap<String, Artifact>,
    requested: Mutex<Vec<String>>,
}

impl MockArtifacts {
    pub fn with(artifacts: Vec<Artifact>) -> Self {
        Self {
            artifacts: artifacts
                .into_iter()
                .map(|artifact| (artifact.contract_name.clone(), artifact))
                .collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl ArtifactLoader for MockArtifacts {
    fn load(&self, name: &str) -> Result<Artifact, ArtifactError> {
        self.requested.lock().unwrap().push(name.to_string());
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound {
                name: name.to_string(),
                dir: "artifacts-zk".into(),
            })
    }
}

#[derive(Default)]
struct DeployerLog {
    attempts: usize,
    deployed: Vec<String>,
    fee_tokens: Vec<Address>,
}

/// Deployer handing out sequential addresses; named contracts revert
#[derive(Default)]
pub struct MockDeployer {
    reverting: Vec<String>,
    log: Mutex<DeployerLog>,
}

impl MockDeployer {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            reverting: names.iter().map(|name| name.to_string()).collect(),
            log: Mutex::default(),
        }
    }

    /// Address given to the `index`-th successful deployment
    pub fn address_for(index: usize) -> Address {
        Address::left_padding_from(&(index as u64 + 1).to_be_bytes())
    }

    pub fn attempts(&self) -> usize {
        self.log.lock().unwrap().attempts
    }

    pub fn deployed(&self) -> Vec<String> {
        self.log.lock().unwrap().deployed.clone()
    }

    pub fn fee_tokens(&self) -> Vec<Address> {
        self.log.lock().unwrap().fee_tokens.clone()
    }
}

#[async_trait]
impl ContractDeployer for MockDeployer {
    async fn deploy(&self, request: DeployRequest<'_>) -> Result<Deployment, DeployError> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;
        let tx_hash = B256::from(U256::from(log.attempts));

        if self.reverting.contains(&request.artifact.contract_name) {
            return Err(DeployError::Reverted(tx_hash));
        }

        let address = Self::address_for(log.deployed.len());
        log.deployed.push(request.artifact.contract_name.clone());
        log.fee_tokens.push(request.fee_token);
        Ok(Deployment { address, tx_hash })
    }
}

/// Explorer double; records which contracts were submitted
#[derive(Default)]
pub struct MockVerifier {
    reject: bool,
    verified: Mutex<Vec<String>>,
}

impl MockVerifier {
    pub fn failing() -> Self {
        Self {
            reject: true,
            verified: Mutex::default(),
        }
    }

    pub fn verified(&self) -> Vec<String> {
        self.verified.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationRequester for MockVerifier {
    async fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerificationId, VerificationError> {
        if self.reject {
            return Err(VerificationError::Rejected {
                status: 500,
                body: "compilation failed".to_string(),
            });
        }
        let mut verified = self.verified.lock().unwrap();
        verified.push(request.artifact.contract_name.clone());
        Ok(verified.len() as VerificationId)
    }
}
