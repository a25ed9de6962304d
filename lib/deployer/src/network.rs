//! Network profile registry.
//!
//! A profile maps a network name to the parameters needed to reach it: an RPC
//! URL template, an optional chain id and the source of the signing account.
//! The builtin set mirrors the networks the project has always deployed to;
//! more can be loaded from a TOML file such as:
//!
//! ```toml
//! [networks.arbitrum_sepolia]
//! url = "https://arb-sepolia.g.alchemy.com/v2/{api_key}"
//! chain_id = 421614
//! toolchain = "hardhat"
//! account = { kind = "private_key", env = "PRIVATE_KEY" }
//! ```

use std::{collections::BTreeMap, fmt, path::Path, time::Duration};

use alloy::{
    signers::local::PrivateKeySigner, transports::http::reqwest::Url,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    account,
    environment::Environment,
    error::{Error, Result},
    toolchain::Toolchain,
};

/// Placeholder substituted with the profile's API key.
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

const DEFAULT_API_KEY_ENV: &str = "ALCHEMY_API_KEY";
const ALCHEMY_ARB_GOERLI: &str =
    "https://arb-goerli.g.alchemy.com/v2/{api_key}";
const ALCHEMY_ARB_MAINNET: &str =
    "https://arb-mainnet.g.alchemy.com/v2/{api_key}";

/// An RPC URL that may embed [`API_KEY_PLACEHOLDER`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcUrlTemplate(String);

impl RpcUrlTemplate {
    /// Wraps a template string.
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The raw template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether rendering needs an API key.
    #[must_use]
    pub fn needs_api_key(&self) -> bool {
        self.0.contains(API_KEY_PLACEHOLDER)
    }

    /// Substitutes `api_key` and parses the result.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the template needs a key and none is
    /// given, or if the result is not an `http(s)` URL with a host.
    pub fn render(&self, api_key: Option<&str>) -> Result<Url> {
        let raw = match (self.needs_api_key(), api_key) {
            (true, Some(key)) => self.0.replace(API_KEY_PLACEHOLDER, key),
            (true, None) => {
                return Err(Error::Configuration(format!(
                    "RPC URL template `{}` needs an API key",
                    self.0
                )))
            }
            (false, _) => self.0.clone(),
        };

        // The rendered URL may contain the key, so only the template is
        // reported.
        let url = Url::parse(&raw).map_err(|e| {
            Error::Configuration(format!(
                "invalid RPC URL from template `{}`: {e}",
                self.0
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
            return Err(Error::Configuration(format!(
                "RPC URL from template `{}` must be http(s) with a host",
                self.0
            )));
        }
        Ok(url)
    }
}

impl fmt::Display for RpcUrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the signing account of a profile comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountSource {
    /// `env` holds a hex encoded private key.
    PrivateKey {
        /// Variable name.
        env: String,
    },
    /// `env` holds a BIP-39 mnemonic, derived at `m/44'/60'/0'/0/{index}`.
    /// A hex private key is accepted too.
    HdWallet {
        /// Variable name.
        env: String,
        /// Address index on the default derivation path.
        #[serde(default)]
        index: u32,
    },
}

impl AccountSource {
    /// Variable the key material is read from.
    #[must_use]
    pub fn env(&self) -> &str {
        match self {
            AccountSource::PrivateKey { env }
            | AccountSource::HdWallet { env, .. } => env,
        }
    }
}

/// Connection parameters of a named network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Profile name, as given on the command line.
    #[serde(skip)]
    pub name: String,
    /// RPC endpoint template.
    pub url: RpcUrlTemplate,
    /// Chain id the endpoint must report, when known.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Signing account.
    pub account: AccountSource,
    /// Project layout used to find or build artifacts.
    #[serde(default = "default_toolchain")]
    pub toolchain: Toolchain,
    /// Fixed gas limit for the creation transaction. Estimated when unset.
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Variable substituted into [`API_KEY_PLACEHOLDER`].
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Overrides the default confirmation wait.
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
}

fn default_toolchain() -> Toolchain {
    Toolchain::Hardhat
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_owned()
}

impl NetworkProfile {
    fn new(name: &str, url: &str, account: AccountSource) -> Self {
        Self {
            name: name.to_owned(),
            url: RpcUrlTemplate::new(url),
            chain_id: None,
            account,
            toolchain: Toolchain::Hardhat,
            gas_limit: None,
            api_key_env: default_api_key_env(),
            confirmation_timeout_secs: None,
        }
    }

    fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    fn truffle(mut self) -> Self {
        self.toolchain = Toolchain::Truffle;
        self
    }

    fn gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }

    /// Per-profile confirmation wait, if configured. Zero is not a wait.
    #[must_use]
    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Resolves the profile against `env`.
    ///
    /// Every variable the profile references must be set; nothing is
    /// contacted over the network.
    ///
    /// # Errors
    ///
    /// [`Error::MissingEnv`] for unset variables, [`Error::Configuration`]
    /// for an unusable URL or key.
    pub fn resolve(&self, env: &Environment) -> Result<ResolvedProfile> {
        let api_key = if self.url.needs_api_key() {
            Some(env.require(&self.api_key_env)?)
        } else {
            None
        };
        let rpc_url = self.url.render(api_key)?;
        let signer = account::signer(&self.account, env)?;

        debug!(
            network = %self.name,
            account = %signer.address(),
            chain_id = ?self.chain_id,
            "resolved network profile"
        );

        Ok(ResolvedProfile {
            name: self.name.clone(),
            rpc_url,
            chain_id: self.chain_id,
            signer,
            toolchain: self.toolchain,
            gas_limit: self.gas_limit,
        })
    }
}

/// A [`NetworkProfile`] with its environment references resolved.
#[derive(Clone)]
pub struct ResolvedProfile {
    /// Profile name.
    pub name: String,
    /// Rendered RPC endpoint. May embed an API key.
    pub rpc_url: Url,
    /// Chain id the endpoint must report, when known.
    pub chain_id: Option<u64>,
    /// Signing account.
    pub signer: PrivateKeySigner,
    /// Project layout.
    pub toolchain: Toolchain,
    /// Fixed gas limit for the creation transaction.
    pub gas_limit: Option<u64>,
}

impl fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("name", &self.name)
            .field("rpc_host", &self.rpc_url.host_str())
            .field("chain_id", &self.chain_id)
            .field("account", &self.signer.address())
            .field("toolchain", &self.toolchain)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    networks: BTreeMap<String, NetworkProfile>,
}

/// Named network profiles. Read-only once built.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    profiles: BTreeMap<String, NetworkProfile>,
}

impl Registry {
    /// The networks of the Hardhat and Truffle configurations.
    ///
    /// `arbitrum_local` is known not to work against a local node (it points
    /// at the hosted Goerli endpoint); it is kept as an ordinary profile.
    #[must_use]
    pub fn builtin() -> Self {
        let private_key = || AccountSource::PrivateKey { env: "PRIVATE_KEY".into() };
        let hd_wallet =
            |env: &str| AccountSource::HdWallet { env: env.into(), index: 0 };

        let profiles = [
            NetworkProfile::new("arbitrum", ALCHEMY_ARB_GOERLI, private_key()),
            NetworkProfile::new(
                "development",
                "http://127.0.0.1:9545",
                hd_wallet("MNEMONIC"),
            )
            .truffle(),
            NetworkProfile::new(
                "arbitrum_local",
                ALCHEMY_ARB_GOERLI,
                hd_wallet("PRIVATE_KEY"),
            )
            .truffle()
            .gas_limit(8_500_000),
            NetworkProfile::new(
                "arbitrum_testnet",
                ALCHEMY_ARB_GOERLI,
                hd_wallet("PRIVATE_KEY"),
            )
            .truffle()
            .chain_id(421_611),
            NetworkProfile::new(
                "arbitrum_mainnet",
                ALCHEMY_ARB_MAINNET,
                hd_wallet("PRIVATE_KEY"),
            )
            .truffle()
            .chain_id(42_161),
            NetworkProfile::new(
                "arbitrum_goerli",
                ALCHEMY_ARB_GOERLI,
                hd_wallet("PRIVATE_KEY"),
            )
            .truffle()
            .chain_id(421_613),
        ];

        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.name.clone(), profile))
                .collect(),
        }
    }

    /// Parses profiles from TOML (see the module docs for the format).
    ///
    /// # Errors
    ///
    /// [`Error::Registry`] on malformed input, [`Error::Configuration`] on
    /// a profile with an empty URL.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(input)?;
        let mut profiles = BTreeMap::new();
        for (name, mut profile) in file.networks {
            if profile.url.as_str().trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "network `{name}` has an empty url"
                )));
            }
            profile.name.clone_from(&name);
            profiles.insert(name, profile);
        }
        Ok(Self { profiles })
    }

    /// Reads profiles from a TOML file.
    ///
    /// # Errors
    ///
    /// See [`Registry::from_toml_str`]; unreadable files are
    /// [`Error::Configuration`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!(
                "failed to read network registry {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&input)
    }

    /// Adds `other`'s profiles, replacing same-name entries.
    #[must_use]
    pub fn merge(mut self, other: Registry) -> Self {
        self.profiles.extend(other.profiles);
        self
    }

    /// Looks up a profile by name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownNetwork`] if no such profile exists.
    pub fn get(&self, name: &str) -> Result<&NetworkProfile> {
        self.profiles.get(name).ok_or_else(|| Error::UnknownNetwork {
            name: name.to_owned(),
            known: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Registered profiles, sorted by name.
    pub fn profiles(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorKind;

    const KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn builtin_profiles_are_complete() {
        let registry = Registry::builtin();
        assert_eq!(registry.names().count(), 6);
        for profile in registry.profiles() {
            assert!(!profile.url.as_str().is_empty(), "{}", profile.name);
            assert!(!profile.account.env().is_empty(), "{}", profile.name);
            assert_eq!(registry.get(&profile.name).unwrap(), profile);
        }
    }

    #[test]
    fn builtin_chain_ids() {
        let registry = Registry::builtin();
        let chain_id = |name| registry.get(name).unwrap().chain_id;
        assert_eq!(chain_id("arbitrum_goerli"), Some(421_613));
        assert_eq!(chain_id("arbitrum_mainnet"), Some(42_161));
        assert_eq!(chain_id("arbitrum_local"), None);
        assert_eq!(
            registry.get("arbitrum_local").unwrap().gas_limit,
            Some(8_500_000)
        );
    }

    #[test]
    fn unknown_network() {
        let err = Registry::builtin().get("optimism").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("arbitrum_goerli"));
    }

    #[test]
    fn resolve_requires_api_key() {
        let registry = Registry::builtin();
        let env = Environment::from_vars([("PRIVATE_KEY", KEY)]);
        let err = registry.get("arbitrum").unwrap().resolve(&env).unwrap_err();
        assert!(
            matches!(&err, Error::MissingEnv(name) if name == "ALCHEMY_API_KEY")
        );
    }

    #[test]
    fn resolve_requires_private_key() {
        let registry = Registry::builtin();
        let env = Environment::from_vars([("ALCHEMY_API_KEY", "abc")]);
        let err = registry.get("arbitrum").unwrap().resolve(&env).unwrap_err();
        assert!(matches!(&err, Error::MissingEnv(name) if name == "PRIVATE_KEY"));
    }

    #[test]
    fn resolve_renders_url() {
        let registry = Registry::builtin();
        let env = Environment::from_vars([
            ("ALCHEMY_API_KEY", "abc123"),
            ("PRIVATE_KEY", KEY),
        ]);
        let resolved =
            registry.get("arbitrum_goerli").unwrap().resolve(&env).unwrap();
        assert_eq!(
            resolved.rpc_url.as_str(),
            "https://arb-goerli.g.alchemy.com/v2/abc123"
        );
        assert_eq!(resolved.chain_id, Some(421_613));
        assert_eq!(resolved.toolchain, Toolchain::Truffle);
        assert!(!format!("{resolved:?}").contains("abc123"));
    }

    #[test]
    fn development_needs_no_api_key() {
        let registry = Registry::builtin();
        let env = Environment::from_vars([(
            "MNEMONIC",
            "test test test test test test test test test test test junk",
        )]);
        let resolved =
            registry.get("development").unwrap().resolve(&env).unwrap();
        assert_eq!(resolved.rpc_url.as_str(), "http://127.0.0.1:9545/");
    }

    #[test]
    fn rejects_non_http_urls() {
        let template = RpcUrlTemplate::new("ws://localhost:8546");
        assert!(template.render(None).is_err());
        let template = RpcUrlTemplate::new("not a url");
        assert!(template.render(None).is_err());
    }

    #[test]
    fn toml_registry_overrides_builtin() {
        let toml = r#"
            [networks.arbitrum]
            url = "http://localhost:8547"
            chain_id = 412346
            account = { kind = "private_key", env = "LOCAL_KEY" }

            [networks.arbitrum_sepolia]
            url = "https://arb-sepolia.g.alchemy.com/v2/{api_key}"
            chain_id = 421614
            toolchain = "truffle"
            confirmation_timeout_secs = 30
            account = { kind = "hd_wallet", env = "MNEMONIC", index = 2 }
        "#;
        let registry =
            Registry::builtin().merge(Registry::from_toml_str(toml).unwrap());

        let arbitrum = registry.get("arbitrum").unwrap();
        assert_eq!(arbitrum.url.as_str(), "http://localhost:8547");
        assert_eq!(arbitrum.toolchain, Toolchain::Hardhat);
        assert_eq!(arbitrum.account.env(), "LOCAL_KEY");

        let sepolia = registry.get("arbitrum_sepolia").unwrap();
        assert_eq!(sepolia.name, "arbitrum_sepolia");
        assert_eq!(sepolia.api_key_env, "ALCHEMY_API_KEY");
        assert_eq!(sepolia.confirmation_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            sepolia.account,
            AccountSource::HdWallet { env: "MNEMONIC".into(), index: 2 }
        );
        assert_eq!(registry.names().count(), 7);
    }

    #[test]
    fn toml_registry_rejects_missing_account() {
        let toml = r#"
            [networks.broken]
            url = "http://localhost:8547"
        "#;
        let err = Registry::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn sample_registry_parses() {
        let registry = Registry::from_toml_str(include_str!(
            "../../../networks.example.toml"
        ))
        .unwrap();
        let devnode = registry.get("nitro_devnode").unwrap();
        assert_eq!(devnode.toolchain, Toolchain::Truffle);
        assert_eq!(devnode.confirmation_timeout(), Some(Duration::from_secs(30)));
        assert!(!devnode.url.needs_api_key());
        assert!(registry.get("arbitrum_sepolia").unwrap().url.needs_api_key());
    }

    proptest! {
        #[test]
        fn rendered_url_embeds_key(key in "[A-Za-z0-9_-]{1,40}") {
            let url = RpcUrlTemplate::new(ALCHEMY_ARB_GOERLI)
                .render(Some(&key))
                .unwrap();
            prop_assert_eq!(url.host_str(), Some("arb-goerli.g.alchemy.com"));
            prop_assert!(url.path().ends_with(&key));
        }

        #[test]
        fn templates_without_placeholder_ignore_key(port in 1u16..) {
            let template = RpcUrlTemplate::new(format!("http://127.0.0.1:{port}"));
            prop_assert_eq!(
                template.render(Some("unused")).unwrap(),
                template.render(None).unwrap()
            );
        }
    }
}
