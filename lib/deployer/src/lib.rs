//! Network profiles and contract deployment for Arbitrum networks.
//!
//! A deployment selects a [`NetworkProfile`] from a [`Registry`], resolves
//! it against a captured [`Environment`] into [`Settings`], and hands the
//! contract artifact to a [`Deployer`]:
//!
//! ```no_run
//! # async fn run() -> deployer::Result<()> {
//! use deployer::{Environment, Registry, Settings};
//!
//! let env = Environment::capture();
//! let settings = Settings::load(&Registry::builtin(), "arbitrum", &env, ".")?;
//! let record = deployer::deploy(
//!     &settings,
//!     "ERC721",
//!     vec!["My Token".into(), "MTK".into()],
//! )
//! .await?;
//! println!("{}", record.deployed_address);
//! # Ok(())
//! # }
//! ```
mod account;
mod artifact;
mod compiler;
mod constructor;
mod deploy;
mod environment;
mod error;
mod network;
mod receipt;
mod settings;
mod system;
mod toolchain;

pub use account::signer;
pub use artifact::{Artifact, ArtifactStore};
pub use compiler::{
    parse_version, CompilerOutput, Diagnostic, Solc, Source, Sources,
    StandardJsonInput,
};
pub use constructor::Constructor;
pub use deploy::{deploy, Chain, Deployer, DeploymentRecord};
pub use environment::Environment;
pub use error::{Error, ErrorKind, Result};
pub use network::{
    AccountSource, NetworkProfile, Registry, ResolvedProfile, RpcUrlTemplate,
    API_KEY_PLACEHOLDER,
};
pub use receipt::Confirmation;
pub use settings::{
    Settings, CONFIRMATION_TIMEOUT_ENV, DEFAULT_CONFIRMATION_TIMEOUT, SOLC_ENV,
};
pub use system::{provider, AlloyChain, Wallet};
pub use toolchain::{CompilerSettings, Toolchain, VerifierSettings};
