//! Compiled contract artifacts
//!
//! Reads hardhat-zksync build output (`artifacts-zk/contracts/Foo.sol/Foo.json`).
//! Foundry-style `{"bytecode": {"object": ...}}` entries are accepted too.
//! The compiler input and versions a contract was built with live in a
//! build-info file, found through the `Foo.dbg.json` beside the artifact or,
//! failing that, by searching `<root>/build-info`.

use alloy::json_abi::JsonAbi;
use alloy::primitives::{hex, Bytes};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ArtifactError;

/// Directory under the artifacts root holding hardhat build-info files.
pub const BUILD_INFO_DIR: &str = "build-info";

/// Compiled bytecode plus interface of one contract
#[derive(Debug, Clone)]
pub struct Artifact {
    pub contract_name: String,
    /// Source path relative to the project root, e.g. `contracts/Foo.sol`
    pub source_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    /// Build-info file of the compilation that produced this artifact
    pub build_info: Option<PathBuf>,
}

impl Artifact {
    /// `sourceName:contractName`, the form explorers expect
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }
}

/// Looks up artifacts by contract name
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<Artifact, ArtifactError>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

impl BytecodeField {
    fn as_hex(&self) -> &str {
        match self {
            BytecodeField::Hex(hex) => hex,
            BytecodeField::Object { object } => object,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    #[serde(default)]
    contract_name: Option<String>,
    #[serde(default)]
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: BytecodeField,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// Only the contract index of a build-info file
#[derive(Debug, Deserialize)]
struct BuildInfoIndex {
    output: BuildInfoContracts,
}

#[derive(Debug, Deserialize)]
struct BuildInfoContracts {
    #[serde(default)]
    contracts: HashMap<String, HashMap<String, IgnoredAny>>,
}

/// Artifacts in a hardhat build directory
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Every `<dir>.sol/<name>.json` under the root
    fn find(&self, name: &str) -> Vec<PathBuf> {
        let file_name = format!("{}.json", name);
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                if path.extension().and_then(|ext| ext.to_str()) == Some("sol") {
                    let candidate = path.join(&file_name);
                    if candidate.is_file() {
                        found.push(candidate);
                    }
                } else {
                    pending.push(path);
                }
            }
        }

        found.sort();
        found
    }

    fn parse(path: &Path, name: &str) -> Result<Artifact, ArtifactError> {
        let content = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: ArtifactFile =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let bytecode = hex::decode(file.bytecode.as_hex()).map_err(|e| ArtifactError::Invalid {
            path: path.to_path_buf(),
            reason: format!("invalid bytecode hex: {}", e),
        })?;
        if bytecode.is_empty() {
            return Err(ArtifactError::EmptyBytecode(name.to_string()));
        }

        // Source name falls back to the enclosing `Foo.sol` directory
        let source_name = file.source_name.unwrap_or_else(|| {
            path.parent()
                .and_then(|dir| dir.file_name())
                .and_then(|dir| dir.to_str())
                .unwrap_or_default()
                .to_string()
        });

        Ok(Artifact {
            contract_name: file.contract_name.unwrap_or_else(|| name.to_string()),
            source_name,
            abi: file.abi,
            bytecode: Bytes::from(bytecode),
            build_info: None,
        })
    }

    /// Build-info named by `<name>.dbg.json`, relative to that file
    fn build_info_from_debug(artifact_path: &Path, name: &str) -> Option<PathBuf> {
        let dir = artifact_path.parent()?;
        let content = fs::read_to_string(dir.join(format!("{}.dbg.json", name))).ok()?;
        let debug: DebugFile = serde_json::from_str(&content).ok()?;
        let path = dir.join(debug.build_info);
        path.is_file().then_some(path)
    }

    /// Build-info under `<root>/build-info` whose output contains the contract
    fn search_build_info(&self, source_name: &str, contract_name: &str) -> Option<PathBuf> {
        let entries = fs::read_dir(self.root.join(BUILD_INFO_DIR)).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        candidates.sort();

        candidates.into_iter().find(|path| {
            let Ok(content) = fs::read_to_string(path) else {
                return false;
            };
            let Ok(index) = serde_json::from_str::<BuildInfoIndex>(&content) else {
                return false;
            };
            index
                .output
                .contracts
                .get(source_name)
                .is_some_and(|contracts| contracts.contains_key(contract_name))
        })
    }

    /// Names of every artifact under the root, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let is_sol_dir = path.extension().and_then(|ext| ext.to_str()) == Some("sol");
                if path.is_dir() && !is_sol_dir {
                    pending.push(path);
                    continue;
                }
                if !is_sol_dir {
                    continue;
                }
                for json in fs::read_dir(&path).into_iter().flatten().flatten() {
                    let file_name = json.file_name();
                    let Some(file_name) = file_name.to_str() else {
                        continue;
                    };
                    // Skip hardhat debug files (`Foo.dbg.json`)
                    if let Some(stem) = file_name.strip_suffix(".json") {
                        if !stem.ends_with(".dbg") && !names.iter().any(|n| n == stem) {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
        }

        names.sort();
        names
    }
}

impl ArtifactLoader for HardhatArtifacts {
    fn load(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let mut matches = self.find(name);
        let path = match matches.len() {
            0 => {
                return Err(ArtifactError::NotFound {
                    name: name.to_string(),
                    dir: self.root.clone(),
                })
            }
            1 => matches.remove(0),
            _ => {
                return Err(ArtifactError::Ambiguous {
                    name: name.to_string(),
                    candidates: matches,
                })
            }
        };

        debug!(contract = name, path = %path.display(), "Loading artifact");
        let mut artifact = Self::parse(&path, name)?;
        artifact.build_info = Self::build_info_from_debug(&path, name)
            .or_else(|| self.search_build_info(&artifact.source_name, &artifact.contract_name));
        if artifact.build_info.is_none() {
            warn!(contract = name, "No build-info found; verification will fail");
        }
        Ok(artifact)
    }
}
