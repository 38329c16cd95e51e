//! Explicit configuration for ledgers and gateway connections.
//!
//! Nothing here reads global state implicitly: `LedgerConfig::from_env` is a
//! constructor the caller opts into, and the resulting value is passed into
//! every `Ledger` it should apply to.

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Identity field used when none is configured.
pub const DEFAULT_INDEX_FIELD: &str = "id";

/// Environment variable naming the target ledger.
pub const LEDGER_ENV: &str = "LEDGER";

/// Environment variable overriding the identity field.
pub const INDEX_FIELD_ENV: &str = "LEDGER_INDEX_FIELD";

/// Target namespace and identity field for documents and queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerConfig {
    /// Logical ledger (database/namespace) name.
    pub ledger: String,
    /// Field used for existence checks and updates.
    #[serde(default = "default_index_field")]
    pub index_field: String,
}

fn default_index_field() -> String {
    DEFAULT_INDEX_FIELD.to_string()
}

impl LedgerConfig {
    pub fn new(ledger: impl Into<String>) -> Self {
        Self {
            ledger: ledger.into(),
            index_field: default_index_field(),
        }
    }

    pub fn with_index_field(mut self, index_field: impl Into<String>) -> Self {
        self.index_field = index_field.into();
        self
    }

    /// Read `LEDGER` and `LEDGER_INDEX_FIELD` from the process environment.
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// `LEDGER` is required and must be non-empty; `LEDGER_INDEX_FIELD`
    /// falls back to [`DEFAULT_INDEX_FIELD`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LedgerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ledger = lookup(LEDGER_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| LedgerError::Config(format!("{} is not set", LEDGER_ENV)))?;

        let config = Self::new(ledger);
        Ok(match lookup(INDEX_FIELD_ENV).filter(|v| !v.trim().is_empty()) {
            Some(index_field) => config.with_index_field(index_field),
            None => config,
        })
    }
}

/// Connection configuration for gateway backends.
#[derive(Debug, Clone)]
pub enum ConnectionConfig {
    /// Connect using a database URL string.
    Url(String),
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::Url(url.to_string())
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::Url(url)
    }
}

impl From<&String> for ConnectionConfig {
    fn from(url: &String) -> Self {
        ConnectionConfig::Url(url.clone())
    }
}
