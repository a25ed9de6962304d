//! Static build settings of the two supported project layouts.
//!
//! Nothing here has behavior of its own: the values are declarations that
//! the compiler invocation and external verification tooling consume as-is.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::environment::Environment;

/// Project layout a network profile builds and deploys with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// `contracts/` sources, `artifacts/<source>/<Name>.json` outputs.
    Hardhat,
    /// `contracts/arbitrum/` sources, `build/arbitrum-contracts/<Name>.json`
    /// outputs.
    Truffle,
}

impl Toolchain {
    /// Solidity sources, relative to the project root.
    #[must_use]
    pub fn contracts_dir(self) -> &'static Path {
        match self {
            Toolchain::Hardhat => Path::new("contracts"),
            Toolchain::Truffle => Path::new("contracts/arbitrum"),
        }
    }

    /// Compiled artifacts, relative to the project root.
    #[must_use]
    pub fn artifacts_dir(self) -> &'static Path {
        match self {
            Toolchain::Hardhat => Path::new("artifacts"),
            Toolchain::Truffle => Path::new("build/arbitrum-contracts"),
        }
    }

    /// Where the artifact of `contract` defined in `source_unit` lives,
    /// relative to [`Toolchain::artifacts_dir`].
    #[must_use]
    pub fn artifact_file(self, source_unit: &str, contract: &str) -> PathBuf {
        let file = format!("{contract}.json");
        match self {
            Toolchain::Hardhat => Path::new(source_unit).join(file),
            Toolchain::Truffle => PathBuf::from(file),
        }
    }

    /// Compiler settings the project is built with.
    #[must_use]
    pub fn compiler_settings(self) -> CompilerSettings {
        match self {
            Toolchain::Hardhat => CompilerSettings {
                version: SOLC_VERSION.to_owned(),
                optimizer_enabled: false,
                optimizer_runs: 200,
            },
            Toolchain::Truffle => CompilerSettings {
                version: SOLC_VERSION.to_owned(),
                optimizer_enabled: true,
                optimizer_runs: 800,
            },
        }
    }

    /// Variable holding the block explorer API key.
    #[must_use]
    pub fn explorer_key_env(self) -> &'static str {
        match self {
            Toolchain::Hardhat => "ARBISCAN_API_KEY",
            Toolchain::Truffle => "ARBISCAN_KEY",
        }
    }

    /// Verification settings, with the API key read from `env` when present.
    #[must_use]
    pub fn verifier_settings(self, env: &Environment) -> VerifierSettings {
        let api_key_env = self.explorer_key_env();
        VerifierSettings {
            explorer: EXPLORER.to_owned(),
            api_key_env: api_key_env.to_owned(),
            api_key: env.get(api_key_env).map(ToOwned::to_owned),
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toolchain::Hardhat => f.write_str("hardhat"),
            Toolchain::Truffle => f.write_str("truffle"),
        }
    }
}

const SOLC_VERSION: &str = "0.8.17";
const EXPLORER: &str = "arbiscan";

/// Solidity compiler configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Exact `solc` release, e.g. `0.8.17`.
    pub version: String,
    /// Whether the optimizer runs.
    pub optimizer_enabled: bool,
    /// Optimizer `runs` parameter.
    pub optimizer_runs: u32,
}

/// Block explorer verification settings.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Explorer name, as understood by verification plugins.
    pub explorer: String,
    /// Variable the key is read from.
    pub api_key_env: String,
    /// The key itself, if set.
    pub api_key: Option<String>,
}

impl fmt::Debug for VerifierSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierSettings")
            .field("explorer", &self.explorer)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
