use std::{future::Future, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, TxHash},
    rpc::types::TransactionRequest,
};
use tracing::{debug, info};

use crate::{
    artifact::Artifact,
    constructor::Constructor,
    error::{Error, Result},
    network::ResolvedProfile,
    receipt::Confirmation,
    settings::{Settings, DEFAULT_CONFIRMATION_TIMEOUT},
    system::AlloyChain,
};

/// The operations a deployment needs from a chain.
pub trait Chain {
    /// Chain id reported by the endpoint.
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Signs and broadcasts `tx`, returning its hash without waiting for it
    /// to be mined.
    fn submit(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Waits until `tx_hash` is mined.
    ///
    /// Fails with [`Error::ConfirmationTimeout`] once `timeout` elapses.
    fn confirm(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> impl Future<Output = Result<Confirmation>> + Send;
}

/// A confirmed deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentRecord {
    /// Deployed contract.
    pub contract_name: String,
    /// Constructor arguments as given.
    pub constructor_args: Vec<String>,
    /// Profile name.
    pub network: String,
    /// Creation transaction.
    pub tx_hash: TxHash,
    /// Address of the new contract.
    pub deployed_address: Address,
    /// Block the creation transaction was mined in.
    pub block_number: Option<u64>,
    /// Gas consumed by the creation transaction.
    pub gas_used: u64,
}

/// A basic smart contract deployer.
#[derive(Debug)]
pub struct Deployer<'a> {
    profile: &'a ResolvedProfile,
    ctor_args: Vec<String>,
    timeout: Duration,
}

impl<'a> Deployer<'a> {
    /// Deployer sending from `profile`'s account, without constructor
    /// arguments.
    #[must_use]
    pub fn new(profile: &'a ResolvedProfile) -> Self {
        Self {
            profile,
            ctor_args: Vec::new(),
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    /// Add constructor arguments to the deployer.
    #[must_use]
    pub fn with_constructor(mut self, ctor_args: Vec<String>) -> Self {
        self.ctor_args = ctor_args;
        self
    }

    /// How long [`Deployer::deploy`] waits for the transaction to be mined.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deploys `artifact` through `chain` and waits for the receipt.
    ///
    /// A single attempt is made.
    ///
    /// # Errors
    ///
    /// May error if:
    ///
    /// - The constructor arguments do not match the artifact's constructor.
    /// - The endpoint reports a chain id other than the profile's.
    /// - The transaction is rejected, reverts, or creates no contract.
    /// - The receipt does not arrive within the timeout.
    pub async fn deploy<C: Chain>(
        &self,
        chain: &C,
        artifact: &Artifact,
    ) -> Result<DeploymentRecord> {
        let constructor = Constructor::encode(&artifact.abi, &self.ctor_args)?;

        if let Some(expected) = self.profile.chain_id {
            let actual = chain.chain_id().await?;
            if actual != expected {
                return Err(Error::ChainIdMismatch {
                    network: self.profile.name.clone(),
                    expected,
                    actual,
                });
            }
            debug!(chain_id = actual, "chain id verified");
        }

        let code = constructor.deploy_code(artifact);
        debug!(
            contract = %artifact.contract_name,
            constructor = %constructor.signature,
            bytecode_len = code.len(),
            "building creation transaction"
        );
        let mut tx = TransactionRequest::default()
            .with_from(self.profile.signer.address())
            .with_deploy_code(code);
        if let Some(gas_limit) = self.profile.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }

        let tx_hash = chain.submit(tx).await?;
        info!(%tx_hash, network = %self.profile.name, "deployment submitted");

        let confirmation = chain.confirm(tx_hash, self.timeout).await?;
        if !confirmation.success {
            return Err(Error::Network(format!(
                "deployment transaction {tx_hash} reverted"
            )));
        }
        let deployed_address =
            confirmation.contract_address.ok_or_else(|| {
                Error::Network(format!(
                    "receipt of {tx_hash} carries no contract address"
                ))
            })?;
        info!(
            %deployed_address,
            block = ?confirmation.block_number,
            gas_used = confirmation.gas_used,
            "deployment confirmed"
        );

        Ok(DeploymentRecord {
            contract_name: artifact.contract_name.clone(),
            constructor_args: self.ctor_args.clone(),
            network: self.profile.name.clone(),
            tx_hash,
            deployed_address,
            block_number: confirmation.block_number,
            gas_used: confirmation.gas_used,
        })
    }
}

/// Resolves the artifact of `contract_name` and deploys it to the network
/// selected in `settings`.
///
/// # Errors
///
/// Any [`Error`]; see [`crate::ArtifactStore::resolve`] and
/// [`Deployer::deploy`].
pub async fn deploy(
    settings: &Settings,
    contract_name: &str,
    constructor_args: Vec<String>,
) -> Result<DeploymentRecord> {
    let artifact = settings.artifacts().resolve(
        contract_name,
        &settings.solc,
        &settings.compiler,
    )?;
    let chain = AlloyChain::connect(&settings.profile);
    Deployer::new(&settings.profile)
        .with_constructor(constructor_args)
        .with_timeout(settings.confirmation_timeout)
        .deploy(&chain, &artifact)
        .await
}
