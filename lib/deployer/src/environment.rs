use std::{collections::HashMap, fmt};

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Snapshot of the process environment, taken once at startup.
///
/// Everything downstream reads variables from here instead of calling
/// [`std::env::var`], so a deployment only ever sees the values that were
/// present when [`Settings`](crate::Settings) was built.
#[derive(Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Loads `.env` (if any) into the process environment and captures it.
    ///
    /// Variables already set in the process take precedence over `.env`.
    #[must_use]
    pub fn capture() -> Self {
        match dotenv::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => debug!(error = %e, "ignoring unreadable .env file"),
        }
        Self::from_vars(std::env::vars())
    }

    /// Builds an environment from explicit key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { vars }
    }

    /// Returns the value of `name`. Empty values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// Returns the value of `name`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingEnv`] if the variable is unset or empty.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| Error::MissingEnv(name.to_owned()))
    }

    /// Like [`Environment::require`], for key material. The returned copy is
    /// wiped on drop.
    ///
    /// # Errors
    ///
    /// [`Error::MissingEnv`] if the variable is unset or empty.
    pub fn secret(&self, name: &str) -> Result<Zeroizing<String>> {
        self.require(name).map(|v| Zeroizing::new(v.to_owned()))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("Environment").field("keys", &keys).finish()
    }
}
