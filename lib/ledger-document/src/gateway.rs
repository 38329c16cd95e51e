//! Boundary contract with the external ledger service.
//!
//! - `LedgerGateway`: provisioning, writes and reads against one ledger
//! - `LedgerConnection`: connecting to and initializing a backend

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{ConnectionConfig, LedgerConfig, LedgerDatetime, LedgerError, Snapshot};

/// Response to a successful insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    /// Revision link id shared by every revision of the written document.
    pub document_id: String,
}

/// Ledger-assigned metadata of one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMetadata {
    /// Revision link id (stable across revisions).
    pub id: String,
    /// Zero-based revision number.
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_time: Option<LedgerDatetime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
}

/// One entry of the audit log: a revision's content and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub data: Snapshot,
    pub metadata: RevisionMetadata,
}

/// Operations this crate needs from a ledger backend.
///
/// Implementations own statement rendering, identifier sanitization,
/// sessions and retries. Every method is one round trip.
#[async_trait]
pub trait LedgerGateway: Clone + Send + Sync {
    /// Names of the tables currently present in the ledger.
    async fn list_tables(&self) -> Result<BTreeSet<String>, LedgerError>;

    /// Create a table. Fails with `Provisioning` if it already exists.
    async fn provision_table(&self, table: &str) -> Result<(), LedgerError>;

    /// Create a lookup index on `index`. Fails with `Provisioning` if present.
    async fn provision_index(&self, table: &str, index: &str) -> Result<(), LedgerError>;

    /// Insert `fields` as a new document.
    async fn insert(&self, table: &str, fields: &Snapshot) -> Result<WriteReceipt, LedgerError>;

    /// Rewrite the whole document whose `index` equals `fields[index]`.
    ///
    /// Fails with `Write` when `fields` has no `index` entry or nothing matches.
    async fn update(
        &self,
        table: &str,
        index: &str,
        fields: &Snapshot,
    ) -> Result<WriteReceipt, LedgerError>;

    /// Every current document in the table.
    async fn select_all(&self, table: &str) -> Result<Vec<Snapshot>, LedgerError>;

    /// Documents whose fields equal every given value.
    async fn select_by_equality(
        &self,
        table: &str,
        filter: &[(String, JsonValue)],
    ) -> Result<Vec<Snapshot>, LedgerError>;

    /// Documents whose fields are members of every given value list.
    async fn select_by_membership(
        &self,
        table: &str,
        filter: &[(String, Vec<JsonValue>)],
    ) -> Result<Vec<Snapshot>, LedgerError>;

    /// Documents whose text fields contain every given needle.
    async fn select_by_match(
        &self,
        table: &str,
        filter: &[(String, String)],
    ) -> Result<Vec<Snapshot>, LedgerError>;

    /// Audit log of the table, restricted to one revision link when given.
    ///
    /// Revisions of a single link are returned oldest to newest.
    async fn select_history(
        &self,
        table: &str,
        link_id: Option<&str>,
    ) -> Result<Vec<HistoryRecord>, LedgerError>;
}

/// Trait for backend connection and initialization.
#[async_trait]
pub trait LedgerConnection: Sized + Send + Sync {
    /// Connect to the backend hosting `ledger`.
    async fn connect(
        config: impl Into<ConnectionConfig> + Send,
        ledger: &LedgerConfig,
    ) -> Result<Self, LedgerError>;

    /// Create whatever the backend needs before tables can be provisioned.
    async fn initialize(&self) -> Result<(), LedgerError>;
}
