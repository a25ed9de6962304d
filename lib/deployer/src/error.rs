use std::{fmt, path::PathBuf, time::Duration};

use alloy::primitives::TxHash;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid environment, unknown network, bad arguments.
    Configuration,
    /// The contract artifact could not be produced.
    Compilation,
    /// The RPC endpoint failed or rejected the transaction.
    Network,
    /// The transaction was not mined within the wait period.
    ConfirmationTimeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Compilation => "compilation error",
            ErrorKind::Network => "network error",
            ErrorKind::ConfirmationTimeout => "confirmation timeout",
        };
        f.write_str(kind)
    }
}

/// Errors produced while resolving a network profile and deploying to it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No profile with this name is registered.
    #[error("unknown network `{name}` (known networks: {known})")]
    UnknownNetwork {
        /// Requested profile name.
        name: String,
        /// Comma separated list of registered names.
        known: String,
    },
    /// A variable required by the selected profile is unset or empty.
    #[error("environment variable `{0}` is required but not set")]
    MissingEnv(String),
    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The TOML network registry could not be parsed.
    #[error("failed to parse network registry: {0}")]
    Registry(#[from] toml::de::Error),
    /// The endpoint serves a different chain than the profile declares.
    #[error(
        "network `{network}` expects chain id {expected}, but the endpoint reports {actual}"
    )]
    ChainIdMismatch {
        /// Profile name.
        network: String,
        /// Chain id declared by the profile.
        expected: u64,
        /// Chain id reported by `eth_chainId`.
        actual: u64,
    },
    /// Constructor arguments do not fit the artifact's constructor.
    #[error("invalid constructor arguments: {0}")]
    ConstructorArgs(String),
    /// No artifact with the requested contract name exists.
    #[error("no artifact for contract `{contract}` under {}", dir.display())]
    ArtifactNotFound {
        /// Requested contract name.
        contract: String,
        /// Directory that was searched.
        dir: PathBuf,
    },
    /// The compiler could not be run or reported errors.
    #[error("compilation failed: {0}")]
    Compilation(String),
    /// The RPC endpoint failed or the transaction was rejected.
    #[error("network error: {0}")]
    Network(String),
    /// The transaction was submitted but not mined in time.
    #[error("transaction {tx_hash} was not confirmed within {}s", timeout.as_secs())]
    ConfirmationTimeout {
        /// Hash of the pending transaction.
        tx_hash: TxHash,
        /// Wait period that elapsed.
        timeout: Duration,
    },
}

impl Error {
    /// Returns the [`ErrorKind`] of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownNetwork { .. }
            | Error::MissingEnv(_)
            | Error::Configuration(_)
            | Error::Registry(_)
            | Error::ChainIdMismatch { .. }
            | Error::ConstructorArgs(_) => ErrorKind::Configuration,
            Error::ArtifactNotFound { .. } | Error::Compilation(_) => {
                ErrorKind::Compilation
            }
            Error::Network(_) => ErrorKind::Network,
            Error::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::MissingEnv("PRIVATE_KEY".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::Compilation("boom".into()).kind(),
            ErrorKind::Compilation
        );
        assert_eq!(Error::Network("down".into()).kind(), ErrorKind::Network);
        let timeout = Error::ConfirmationTimeout {
            tx_hash: TxHash::ZERO,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(timeout.kind(), ErrorKind::ConfirmationTimeout);
        assert!(timeout.to_string().contains("within 5s"));
    }

    #[test]
    fn unknown_network_lists_known_names() {
        let err = Error::UnknownNetwork {
            name: "optimism".into(),
            known: "arbitrum, development".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown network `optimism`"));
        assert!(msg.contains("arbitrum, development"));
    }
}
