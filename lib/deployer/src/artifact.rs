use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    compiler::Solc,
    error::{Error, Result},
    toolchain::{CompilerSettings, Toolchain},
};

/// Compiled contract: what a contract factory needs to build a creation
/// transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    /// Contract name.
    pub contract_name: String,
    /// Contract ABI.
    pub abi: JsonAbi,
    /// Creation bytecode, without constructor arguments.
    pub bytecode: Bytes,
}

/// Hardhat and Truffle store the bytecode as a hex string, Foundry as
/// `{ "object": "0x..." }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BytecodeField {
    Hex(String),
    Object { object: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactFile {
    #[serde(default)]
    contract_name: Option<String>,
    abi: JsonAbi,
    bytecode: BytecodeField,
}

impl Artifact {
    /// Builds an artifact from its parts, decoding `bytecode`.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if the bytecode is empty (abstract contracts,
    /// interfaces) or not valid hex (e.g. unlinked libraries).
    pub fn new(
        contract_name: impl Into<String>,
        abi: JsonAbi,
        bytecode: &str,
    ) -> Result<Self> {
        let contract_name = contract_name.into();
        let hex = bytecode.trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.is_empty() {
            return Err(Error::Compilation(format!(
                "`{contract_name}` has no deployable bytecode (abstract contract or interface?)"
            )));
        }
        if hex.contains("__") {
            return Err(Error::Compilation(format!(
                "`{contract_name}` references unlinked libraries"
            )));
        }
        let bytecode = alloy::hex::decode(hex).map_err(|e| {
            Error::Compilation(format!(
                "`{contract_name}` has malformed bytecode: {e}"
            ))
        })?;

        Ok(Self { contract_name, abi, bytecode: bytecode.into() })
    }

    /// Parses a Hardhat, Truffle or Foundry artifact. `fallback_name` is used
    /// when the file does not record the contract name.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if the JSON is malformed or the bytecode is
    /// unusable.
    pub fn from_json(fallback_name: &str, json: &str) -> Result<Self> {
        let file: ArtifactFile = serde_json::from_str(json).map_err(|e| {
            Error::Compilation(format!(
                "malformed artifact for `{fallback_name}`: {e}"
            ))
        })?;
        let name = file.contract_name.unwrap_or_else(|| fallback_name.into());
        let bytecode = match file.bytecode {
            BytecodeField::Hex(hex) | BytecodeField::Object { object: hex } => {
                hex
            }
        };
        Self::new(name, file.abi, &bytecode)
    }

    /// Reads an artifact file.
    ///
    /// # Errors
    ///
    /// See [`Artifact::from_json`].
    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            Error::Compilation(format!("failed to read {}: {e}", path.display()))
        })?;
        let fallback = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
        Self::from_json(&fallback, &json)
    }

    fn to_json(&self, source_unit: &str) -> serde_json::Value {
        serde_json::json!({
            "contractName": self.contract_name,
            "sourceName": source_unit,
            "abi": self.abi,
            "bytecode": self.bytecode.to_string(),
        })
    }
}

/// Locates, and when missing builds, artifacts of one project layout.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    toolchain: Toolchain,
}

impl ArtifactStore {
    /// Store for the project at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, toolchain: Toolchain) -> Self {
        Self { root: root.into(), toolchain }
    }

    /// Absolute artifacts directory.
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(self.toolchain.artifacts_dir())
    }

    /// Absolute sources directory.
    #[must_use]
    pub fn contracts_dir(&self) -> PathBuf {
        self.root.join(self.toolchain.contracts_dir())
    }

    /// Finds the artifact file of `contract`, if one was built.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if several artifacts carry the name.
    pub fn find(&self, contract: &str) -> Result<Option<PathBuf>> {
        let dir = self.artifacts_dir();
        let file_name = format!("{contract}.json");

        let mut matches = match self.toolchain {
            Toolchain::Truffle => {
                let path = dir.join(&file_name);
                if path.is_file() {
                    vec![path]
                } else {
                    vec![]
                }
            }
            // <source>.sol/<Name>.json anywhere below, except build-info.
            Toolchain::Hardhat => files_with_extension(&dir, "json")
                .into_iter()
                .filter(|path| {
                    path.file_name().is_some_and(|f| f == file_name.as_str())
                        && path.parent().is_some_and(|parent| {
                            parent.extension().is_some_and(|ext| ext == "sol")
                        })
                        && !path.components().any(|c| {
                            c.as_os_str() == "build-info"
                        })
                })
                .collect(),
        };

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => {
                matches.sort();
                let found = matches
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(Error::Compilation(format!(
                    "multiple artifacts named `{contract}`: {found}"
                )))
            }
        }
    }

    /// Loads the built artifact of `contract`.
    ///
    /// # Errors
    ///
    /// [`Error::ArtifactNotFound`] if it was never built, otherwise see
    /// [`Artifact::read`].
    pub fn load(&self, contract: &str) -> Result<Artifact> {
        let path =
            self.find(contract)?.ok_or_else(|| Error::ArtifactNotFound {
                contract: contract.to_owned(),
                dir: self.artifacts_dir(),
            })?;
        debug!(path = %path.display(), "loading artifact");
        Artifact::read(&path)
    }

    /// Loads the artifact of `contract`, compiling the project with `solc`
    /// when it was never built.
    ///
    /// # Errors
    ///
    /// Any [`Error`] of kind [`Compilation`](crate::ErrorKind::Compilation).
    pub fn resolve(
        &self,
        contract: &str,
        solc: &Solc,
        settings: &CompilerSettings,
    ) -> Result<Artifact> {
        match self.load(contract) {
            Err(Error::ArtifactNotFound { .. }) => {}
            loaded => return loaded,
        }

        info!(
            contract,
            toolchain = %self.toolchain,
            "no artifact found, compiling sources"
        );
        let sources = solc.collect_sources(&self.root, &self.contracts_dir())?;
        let output = solc.compile(settings, sources)?;
        let (source_unit, artifact) = output.into_artifact(contract)?;
        self.store(&source_unit, &artifact)?;
        Ok(artifact)
    }

    /// Writes `artifact` into this layout.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if the file cannot be written.
    pub fn store(
        &self,
        source_unit: &str,
        artifact: &Artifact,
    ) -> Result<PathBuf> {
        let path = self.artifacts_dir().join(
            self.toolchain.artifact_file(source_unit, &artifact.contract_name),
        );
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(
                &artifact.to_json(source_unit),
            )?;
            fs::write(&path, json)
        };
        write().map_err(|e| {
            Error::Compilation(format!(
                "failed to write artifact {}: {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "stored artifact");
        Ok(path)
    }
}

/// All files below `dir` with extension `ext`, recursively. Unreadable
/// directories are skipped.
pub(crate) fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == ext) {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}
