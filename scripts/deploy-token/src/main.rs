//! Deploys an ERC721 token to one of the configured Arbitrum networks.
//!
//! ```text
//! deploy-token arbitrum_goerli
//! deploy-token --contract MyNft --arg "My NFT" --arg NFT arbitrum
//! deploy-token --list
//! ```
use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use deployer::{Environment, Registry, Settings};
use eyre::{eyre, WrapErr};

mod logging;

const TOKEN_NAME: &str = "My Token";
const TOKEN_SYMBOL: &str = "MTK";

#[derive(Debug, Parser)]
#[command(name = "deploy-token", version)]
#[command(about = "Deploy an ERC721 token to an Arbitrum network")]
struct Cli {
    /// Network profile to deploy to.
    #[arg(required_unless_present = "list")]
    network: Option<String>,
    /// TOML file with additional or overriding network profiles.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Contract to deploy.
    #[arg(long, default_value = "ERC721")]
    contract: String,
    /// Constructor argument, repeat in declaration order.
    #[arg(long = "arg", value_name = "VALUE", allow_hyphen_values = true)]
    args: Vec<String>,
    /// Project root holding the contract sources and build output.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Print the known network profiles and exit.
    #[arg(long)]
    list: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{err:#}");
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> eyre::Result<()> {
    let env = Environment::capture();

    let mut registry = Registry::builtin();
    if let Some(path) = &cli.config {
        let overlay = Registry::from_file(path).wrap_err_with(|| {
            format!("failed to load network profiles from {}", path.display())
        })?;
        registry = registry.merge(overlay);
    }

    if cli.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let network = cli.network.ok_or_else(|| eyre!("no network given"))?;
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()
            .wrap_err("failed to determine the current directory")?,
    };
    let settings = Settings::load(&registry, &network, &env, root)
        .wrap_err_with(|| format!("cannot deploy to `{network}`"))?;

    let args = if cli.args.is_empty() {
        vec![TOKEN_NAME.to_owned(), TOKEN_SYMBOL.to_owned()]
    } else {
        cli.args
    };
    let record = deployer::deploy(&settings, &cli.contract, args)
        .await
        .wrap_err_with(|| format!("failed to deploy `{}`", cli.contract))?;

    println!("Token deployed to: {}", record.deployed_address);
    Ok(())
}
