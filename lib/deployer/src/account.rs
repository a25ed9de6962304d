use alloy::signers::local::{
    coins_bip39::English, MnemonicBuilder, PrivateKeySigner,
};

use crate::{
    environment::Environment,
    error::{Error, Result},
    network::AccountSource,
};

/// Builds the signer described by `source`.
///
/// Error messages name the variable, never its value.
///
/// # Errors
///
/// [`Error::MissingEnv`] if the variable is unset, [`Error::Configuration`]
/// if it holds neither a valid private key nor a valid mnemonic.
pub fn signer(
    source: &AccountSource,
    env: &Environment,
) -> Result<PrivateKeySigner> {
    let var = source.env();
    let secret = env.secret(var)?;

    match source {
        AccountSource::PrivateKey { .. } => from_private_key(&secret, var),
        AccountSource::HdWallet { index, .. } => {
            if looks_like_private_key(&secret) {
                from_private_key(&secret, var)
            } else {
                from_mnemonic(&secret, *index, var)
            }
        }
    }
}

fn looks_like_private_key(secret: &str) -> bool {
    let hex = secret.strip_prefix("0x").unwrap_or(secret);
    hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

fn from_private_key(secret: &str, var: &str) -> Result<PrivateKeySigner> {
    secret.parse::<PrivateKeySigner>().map_err(|_| {
        Error::Configuration(format!("`{var}` is not a valid private key"))
    })
}

fn from_mnemonic(
    phrase: &str,
    index: u32,
    var: &str,
) -> Result<PrivateKeySigner> {
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .index(index)
        .and_then(|builder| builder.build())
        .map_err(|_| {
            Error::Configuration(format!(
                "`{var}` is neither a private key nor a valid mnemonic"
            ))
        })
}
