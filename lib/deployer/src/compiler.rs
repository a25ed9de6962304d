//! `solc --standard-json` invocation.
//!
//! Used only when a contract has no built artifact yet. The
//! [`CompilerSettings`] of the selected toolchain are copied verbatim into
//! the standard-JSON input.

use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use alloy::json_abi::JsonAbi;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    artifact::{files_with_extension, Artifact},
    error::{Error, Result},
    toolchain::CompilerSettings,
};

/// Handle on a `solc` executable.
#[derive(Clone, Debug)]
pub struct Solc {
    binary: PathBuf,
}

impl Default for Solc {
    fn default() -> Self {
        Self::new("solc")
    }
}

/// Solidity sources of a project, keyed by path relative to its root.
#[derive(Clone, Debug, Default)]
pub struct Sources {
    root: PathBuf,
    files: BTreeMap<String, Source>,
}

impl Sources {
    /// Number of source files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether there are no source files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// One source file of the standard-JSON input.
#[derive(Clone, Debug, Serialize)]
pub struct Source {
    content: String,
}

/// The `solc --standard-json` input document.
#[derive(Debug, Serialize)]
pub struct StandardJsonInput<'a> {
    language: &'static str,
    sources: &'a BTreeMap<String, Source>,
    settings: InputSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputSettings {
    optimizer: Optimizer,
    output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Serialize)]
struct Optimizer {
    enabled: bool,
    runs: u32,
}

impl<'a> StandardJsonInput<'a> {
    /// Builds the input for `sources` compiled with `settings`.
    #[must_use]
    pub fn new(settings: &CompilerSettings, sources: &'a Sources) -> Self {
        let selection: Vec<String> = ["abi", "evm.bytecode.object"]
            .into_iter()
            .map(String::from)
            .collect();
        let output_selection = BTreeMap::from([(
            "*".to_owned(),
            BTreeMap::from([("*".to_owned(), selection)]),
        )]);

        Self {
            language: "Solidity",
            sources: &sources.files,
            settings: InputSettings {
                optimizer: Optimizer {
                    enabled: settings.optimizer_enabled,
                    runs: settings.optimizer_runs,
                },
                output_selection,
            },
        }
    }
}

/// Compiler diagnostic.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// `error`, `warning` or `info`.
    pub severity: String,
    /// Short message.
    pub message: String,
    /// Message with source location, when available.
    #[serde(default)]
    pub formatted_message: Option<String>,
}

impl Diagnostic {
    fn is_error(&self) -> bool {
        self.severity == "error"
    }

    fn text(&self) -> &str {
        self.formatted_message.as_deref().unwrap_or(&self.message).trim()
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CompiledContract {
    abi: JsonAbi,
    evm: Evm,
}

#[derive(Clone, Debug, Deserialize)]
struct Evm {
    bytecode: EvmBytecode,
}

#[derive(Clone, Debug, Deserialize)]
struct EvmBytecode {
    object: String,
}

/// The `solc --standard-json` output document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompilerOutput {
    /// Diagnostics, errors and warnings alike.
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, CompiledContract>>,
}

impl CompilerOutput {
    /// Parses compiler output, failing on error diagnostics.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if the output is not valid JSON or reports
    /// errors.
    pub fn parse(json: &[u8]) -> Result<Self> {
        let output: Self = serde_json::from_slice(json).map_err(|e| {
            Error::Compilation(format!("unreadable compiler output: {e}"))
        })?;

        for warning in output.errors.iter().filter(|d| !d.is_error()) {
            warn!(severity = %warning.severity, "{}", warning.message);
        }
        let errors: Vec<_> = output
            .errors
            .iter()
            .filter(|d| d.is_error())
            .map(Diagnostic::text)
            .collect();
        if !errors.is_empty() {
            return Err(Error::Compilation(errors.join("\n")));
        }
        Ok(output)
    }

    /// Extracts `contract` and the source unit defining it.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if no source or several sources define it, or
    /// its bytecode is not deployable.
    pub fn into_artifact(mut self, contract: &str) -> Result<(String, Artifact)> {
        let mut defining: Vec<String> = self
            .contracts
            .iter()
            .filter(|(_, contracts)| contracts.contains_key(contract))
            .map(|(source, _)| source.clone())
            .collect();

        let source = match defining.len() {
            0 => {
                return Err(Error::Compilation(format!(
                    "no source defines contract `{contract}`"
                )))
            }
            1 => defining.remove(0),
            _ => {
                return Err(Error::Compilation(format!(
                    "contract `{contract}` is defined in several sources: {}",
                    defining.join(", ")
                )))
            }
        };

        let compiled = self
            .contracts
            .get_mut(&source)
            .and_then(|contracts| contracts.remove(contract))
            .ok_or_else(|| {
                Error::Compilation(format!("`{contract}` missing from output"))
            })?;
        let artifact =
            Artifact::new(contract, compiled.abi, &compiled.evm.bytecode.object)?;
        Ok((source, artifact))
    }
}

/// Extracts `x.y.z` from `solc --version` output.
#[must_use]
pub fn parse_version(output: &str) -> Option<String> {
    let re = Regex::new(r"Version:\s*(\d+\.\d+\.\d+)").ok()?;
    re.captures(output)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_owned())
}

impl Solc {
    /// Uses the executable at `binary` (looked up in `PATH` if bare).
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Path of the executable.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Queries the installed compiler release.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if `solc` cannot be run or prints no version.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(&e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| {
            Error::Compilation(format!(
                "`{} --version` printed no version",
                self.binary.display()
            ))
        })
    }

    /// Checks that the installed release is `expected`.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] on mismatch, or see [`Solc::version`].
    pub fn check_version(&self, expected: &str) -> Result<()> {
        let installed = self.version()?;
        if installed != expected {
            return Err(Error::Compilation(format!(
                "project requires solc {expected}, but {} is {installed}",
                self.binary.display()
            )));
        }
        Ok(())
    }

    /// Reads every `.sol` file below `contracts_dir`.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] if there are none or one cannot be read.
    pub fn collect_sources(
        &self,
        root: &Path,
        contracts_dir: &Path,
    ) -> Result<Sources> {
        let mut files = BTreeMap::new();
        for path in files_with_extension(contracts_dir, "sol") {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::Compilation(format!(
                    "failed to read {}: {e}",
                    path.display()
                ))
            })?;
            let key = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(key, Source { content });
        }

        if files.is_empty() {
            return Err(Error::Compilation(format!(
                "no Solidity sources under {}",
                contracts_dir.display()
            )));
        }
        Ok(Sources { root: root.to_path_buf(), files })
    }

    /// The standard-JSON invocation for a project at `root`. Imports resolve
    /// against the root and its `node_modules`.
    #[must_use]
    pub fn command(&self, root: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--standard-json")
            .arg("--base-path")
            .arg(root)
            .arg("--include-path")
            .arg(root.join("node_modules"));
        command
    }

    /// Compiles `sources` with `settings`.
    ///
    /// # Errors
    ///
    /// [`Error::Compilation`] on version mismatch, spawn failure or compiler
    /// errors.
    pub fn compile(
        &self,
        settings: &CompilerSettings,
        sources: Sources,
    ) -> Result<CompilerOutput> {
        self.check_version(&settings.version)?;

        let input = serde_json::to_vec(&StandardJsonInput::new(
            settings, &sources,
        ))
        .map_err(|e| Error::Compilation(format!("invalid compiler input: {e}")))?;
        debug!(
            sources = sources.len(),
            optimizer = settings.optimizer_enabled,
            runs = settings.optimizer_runs,
            "running solc"
        );

        let mut child = self
            .command(&sources.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).map_err(|e| self.spawn_error(&e))?;
        }
        let output =
            child.wait_with_output().map_err(|e| self.spawn_error(&e))?;

        if !output.status.success() {
            return Err(Error::Compilation(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        CompilerOutput::parse(&output.stdout)
    }

    fn spawn_error(&self, e: &std::io::Error) -> Error {
        Error::Compilation(format!(
            "failed to run `{}`: {e}",
            self.binary.display()
        ))
    }
}
