use std::{path::PathBuf, time::Duration};

use tracing::{info, warn};

use crate::{
    artifact::ArtifactStore,
    compiler::Solc,
    environment::Environment,
    error::{Error, Result},
    network::{Registry, ResolvedProfile},
    toolchain::{CompilerSettings, VerifierSettings},
};

/// Confirmation wait when neither the profile nor the environment sets one.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Overrides the confirmation wait, in seconds.
pub const CONFIRMATION_TIMEOUT_ENV: &str = "DEPLOY_CONFIRMATION_TIMEOUT_SECS";

/// Path of the `solc` executable.
pub const SOLC_ENV: &str = "SOLC";

/// Everything a deployment needs, resolved once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Selected network.
    pub profile: ResolvedProfile,
    /// Compiler settings of the profile's toolchain.
    pub compiler: CompilerSettings,
    /// Explorer settings of the profile's toolchain.
    pub verifier: VerifierSettings,
    /// Project root holding sources and artifacts.
    pub root: PathBuf,
    /// Compiler used when an artifact is missing.
    pub solc: Solc,
    /// How long to wait for the creation transaction to be mined.
    pub confirmation_timeout: Duration,
}

impl Settings {
    /// Selects `network` from `registry` and resolves it against `env`.
    ///
    /// # Errors
    ///
    /// Any [`Error`] of kind [`Configuration`](crate::ErrorKind::Configuration):
    /// unknown network, unset variables, unusable values.
    pub fn load(
        registry: &Registry,
        network: &str,
        env: &Environment,
        root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let selected = registry.get(network)?;
        let profile = selected.resolve(env)?;
        let toolchain = profile.toolchain;

        let confirmation_timeout = match (
            env.get(CONFIRMATION_TIMEOUT_ENV),
            selected.confirmation_timeout_secs,
        ) {
            (Some(raw), _) => parse_timeout(raw)?,
            (None, Some(secs)) => positive_timeout(secs).ok_or_else(|| {
                Error::Configuration(format!(
                    "`confirmation_timeout_secs` of network `{network}` must be a positive number of seconds"
                ))
            })?,
            (None, None) => DEFAULT_CONFIRMATION_TIMEOUT,
        };

        let verifier = toolchain.verifier_settings(env);
        if verifier.api_key.is_none() {
            warn!(
                var = %verifier.api_key_env,
                "explorer API key not set"
            );
        }

        let settings = Self {
            compiler: toolchain.compiler_settings(),
            verifier,
            root: root.into(),
            solc: Solc::new(env.get(SOLC_ENV).unwrap_or("solc")),
            confirmation_timeout,
            profile,
        };
        info!(
            network = %settings.profile.name,
            toolchain = %toolchain,
            account = %settings.profile.signer.address(),
            "configuration loaded"
        );
        Ok(settings)
    }

    /// Artifact store of the profile's toolchain under [`Settings::root`].
    #[must_use]
    pub fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(&self.root, self.profile.toolchain)
    }
}

fn positive_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    raw.parse::<u64>().ok().and_then(positive_timeout).ok_or_else(|| {
        Error::Configuration(format!(
            "`{CONFIRMATION_TIMEOUT_ENV}` must be a positive number of seconds, got `{raw}`"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, toolchain::Toolchain};

    const KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn env(extra: &[(&str, &str)]) -> Environment {
        let mut vars = vec![("ALCHEMY_API_KEY", "key"), ("PRIVATE_KEY", KEY)];
        vars.extend_from_slice(extra);
        Environment::from_vars(vars)
    }

    #[test]
    fn loads_hardhat_profile() {
        let settings =
            Settings::load(&Registry::builtin(), "arbitrum", &env(&[]), "/p")
                .unwrap();
        assert_eq!(settings.profile.toolchain, Toolchain::Hardhat);
        assert_eq!(settings.compiler, Toolchain::Hardhat.compiler_settings());
        assert_eq!(settings.verifier.api_key_env, "ARBISCAN_API_KEY");
        assert_eq!(settings.confirmation_timeout, DEFAULT_CONFIRMATION_TIMEOUT);
        assert_eq!(settings.solc.binary(), std::path::Path::new("solc"));
        assert_eq!(
            settings.artifacts().artifacts_dir(),
            PathBuf::from("/p/artifacts")
        );
    }

    #[test]
    fn loads_truffle_profile_with_overrides() {
        let settings = Settings::load(
            &Registry::builtin(),
            "arbitrum_goerli",
            &env(&[
                (CONFIRMATION_TIMEOUT_ENV, "15"),
                (SOLC_ENV, "/usr/local/bin/solc-0.8.17"),
                ("ARBISCAN_KEY", "explorer"),
            ]),
            "/p",
        )
        .unwrap();
        assert_eq!(settings.compiler.optimizer_runs, 800);
        assert_eq!(settings.verifier.api_key.as_deref(), Some("explorer"));
        assert_eq!(settings.confirmation_timeout, Duration::from_secs(15));
        assert_eq!(
            settings.artifacts().artifacts_dir(),
            PathBuf::from("/p/build/arbitrum-contracts")
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        for raw in ["0", "soon", "-3"] {
            let err = Settings::load(
                &Registry::builtin(),
                "arbitrum",
                &env(&[(CONFIRMATION_TIMEOUT_ENV, raw)]),
                "/p",
            )
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn rejects_zero_profile_timeout() {
        let overlay = Registry::from_toml_str(
            r#"
            [networks.impatient]
            url = "http://127.0.0.1:8547"
            confirmation_timeout_secs = 0
            account = { kind = "private_key", env = "PRIVATE_KEY" }
            "#,
        )
        .unwrap();
        let registry = Registry::builtin().merge(overlay);

        let err = Settings::load(&registry, "impatient", &env(&[]), "/p")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("`impatient`"));

        // An explicit override still wins over the profile value.
        let settings = Settings::load(
            &registry,
            "impatient",
            &env(&[(CONFIRMATION_TIMEOUT_ENV, "30")]),
            "/p",
        )
        .unwrap();
        assert_eq!(settings.confirmation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn profile_timeout_applies_without_override() {
        let overlay = Registry::from_toml_str(
            r#"
            [networks.devnode]
            url = "http://127.0.0.1:8547"
            confirmation_timeout_secs = 45
            account = { kind = "private_key", env = "PRIVATE_KEY" }
            "#,
        )
        .unwrap();

        let settings = Settings::load(&overlay, "devnode", &env(&[]), "/p")
            .unwrap();
        assert_eq!(settings.confirmation_timeout, Duration::from_secs(45));
    }

    #[test]
    fn unknown_network_fails_before_resolution() {
        let err = Settings::load(
            &Registry::builtin(),
            "mainnet",
            &Environment::default(),
            "/p",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownNetwork { .. }));
    }
}
