use std::{fmt, time::Duration};

use alloy::{
    network::EthereumWallet,
    primitives::TxHash,
    providers::{
        DynProvider, PendingTransactionBuilder, PendingTransactionError,
        Provider, ProviderBuilder, WatchTxError,
    },
    rpc::types::TransactionRequest,
    transports::http::reqwest::Url,
};
use tracing::debug;

use crate::{
    deploy::Chain,
    error::{Error, Result},
    network::ResolvedProfile,
    receipt::Confirmation,
};

/// Convenience type alias for a provider that signs with the profile's
/// account.
pub type Wallet = DynProvider;

/// Builds a signing HTTP provider for `profile`. Nothing is sent until the
/// provider is used.
#[must_use]
pub fn provider(profile: &ResolvedProfile) -> Wallet {
    let wallet = EthereumWallet::from(profile.signer.clone());
    ProviderBuilder::new()
        .wallet(wallet)
        .connect_http(profile.rpc_url.clone())
        .erased()
}

/// [`Chain`] backed by a JSON-RPC endpoint.
///
/// Transport errors quote the request URL, which may embed an API key; every
/// error message leaving this type has the URL replaced by its origin.
#[derive(Clone)]
pub struct AlloyChain {
    wallet: Wallet,
    rpc_url: Url,
}

impl AlloyChain {
    /// Wraps an existing provider talking to `rpc_url`.
    #[must_use]
    pub fn new(wallet: Wallet, rpc_url: Url) -> Self {
        Self { wallet, rpc_url }
    }

    /// Provider for `profile`, see [`provider`].
    #[must_use]
    pub fn connect(profile: &ResolvedProfile) -> Self {
        Self::new(provider(profile), profile.rpc_url.clone())
    }

    fn network_error(&self, context: &str, e: &impl fmt::Display) -> Error {
        Error::Network(redact(&self.rpc_url, &format!("{context}: {e}")))
    }
}

/// Replaces `url` in `message` with its origin. The path and query, where
/// API keys live, are dropped wherever they appear.
fn redact(url: &Url, message: &str) -> String {
    let origin = url.origin().ascii_serialization();
    let mut redacted =
        message.replace(url.as_str(), &format!("{origin}/<redacted>"));
    if url.path().len() > 1 {
        redacted = redacted.replace(url.path(), "/<redacted>");
    }
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        redacted = redacted.replace(query, "<redacted>");
    }
    redacted
}

fn confirmation_error(
    e: PendingTransactionError,
    tx_hash: TxHash,
    timeout: Duration,
) -> Option<Error> {
    match e {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            Some(Error::ConfirmationTimeout { tx_hash, timeout })
        }
        _ => None,
    }
}

impl Chain for AlloyChain {
    async fn chain_id(&self) -> Result<u64> {
        self.wallet
            .get_chain_id()
            .await
            .map_err(|e| self.network_error("eth_chainId failed", &e))
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxHash> {
        let pending = self.wallet.send_transaction(tx).await.map_err(|e| {
            self.network_error("deployment transaction rejected", &e)
        })?;
        Ok(*pending.tx_hash())
    }

    async fn confirm(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation> {
        debug!(%tx_hash, timeout_secs = timeout.as_secs(), "watching transaction");
        let receipt =
            PendingTransactionBuilder::new(self.wallet.root().clone(), tx_hash)
                .with_timeout(Some(timeout))
                .get_receipt()
                .await
                .map_err(|e| {
                    let message = e.to_string();
                    confirmation_error(e, tx_hash, timeout).unwrap_or_else(|| {
                        self.network_error(
                            &format!("failed to confirm {tx_hash}"),
                            &message,
                        )
                    })
                })?;
        Ok(Confirmation::from_receipt(&receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{environment::Environment, error::ErrorKind, network::Registry};

    const API_KEY: &str = "s3cr3tApiKey";
    const KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn unreachable_profile() -> ResolvedProfile {
        let registry = Registry::from_toml_str(
            r#"
            [networks.offline]
            url = "http://127.0.0.1:1/v2/{api_key}"
            account = { kind = "private_key", env = "PRIVATE_KEY" }
            "#,
        )
        .unwrap();
        let env = Environment::from_vars([
            ("ALCHEMY_API_KEY", API_KEY),
            ("PRIVATE_KEY", KEY),
        ]);
        registry.get("offline").unwrap().resolve(&env).unwrap()
    }

    #[test]
    fn redact_drops_path_and_query() {
        let url: Url = "https://arb-goerli.g.alchemy.com/v2/abc123?token=xyz"
            .parse()
            .unwrap();
        let message = format!("error sending request for url ({url})");
        let redacted = redact(&url, &message);
        assert_eq!(
            redacted,
            "error sending request for url (https://arb-goerli.g.alchemy.com/<redacted>)"
        );

        let stray = redact(&url, "path /v2/abc123 and token=xyz");
        assert!(!stray.contains("abc123"));
        assert!(!stray.contains("xyz"));
    }

    #[test]
    fn redact_keeps_bare_origins() {
        let url: Url = "http://127.0.0.1:8547".parse().unwrap();
        assert_eq!(redact(&url, "connection refused"), "connection refused");
    }

    #[test]
    fn watcher_timeout_maps_to_confirmation_timeout() {
        let timeout = Duration::from_secs(3);
        let err = confirmation_error(
            PendingTransactionError::TxWatcher(WatchTxError::Timeout),
            TxHash::ZERO,
            timeout,
        )
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfirmationTimeout);

        assert!(confirmation_error(
            PendingTransactionError::FailedToRegister,
            TxHash::ZERO,
            timeout,
        )
        .is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_does_not_leak_api_key() {
        let chain = AlloyChain::connect(&unreachable_profile());

        let err = chain.chain_id().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.to_string().contains(API_KEY));

        let tx = TransactionRequest::default();
        let err = chain.submit(tx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.to_string().contains(API_KEY));
    }
}
