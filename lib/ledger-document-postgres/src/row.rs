//! Row layout shared by current-document and history tables.

use ledger_document::{HistoryRecord, LedgerDatetime, LedgerError, RevisionMetadata, Snapshot};
use serde::{Deserialize, Serialize};

/// Column names, in insert order.
pub(crate) const COLUMNS: &[&str] = &["doc_id", "version", "document", "tx_id", "tx_time"];

/// Binding type of each entry of [`COLUMNS`].
pub(crate) const COLUMN_TYPES: &[&str] = &["text", "bigint", "jsonb", "text", "datetime"];

/// Columns rewritten by an update, keyed by `doc_id`.
pub(crate) const MUTABLE_COLUMNS: &[&str] = &["version", "document", "tx_id", "tx_time"];

/// Binding type of each entry of [`MUTABLE_COLUMNS`].
pub(crate) const MUTABLE_COLUMN_TYPES: &[&str] = &["bigint", "jsonb", "text", "datetime"];

/// One revision of one document as stored in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredRow {
    pub doc_id: String,
    pub version: i64,
    pub document: Snapshot,
    #[serde(default)]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub tx_time: Option<LedgerDatetime>,
}

impl StoredRow {
    /// First revision of a freshly inserted document.
    pub fn first(doc_id: String, document: Snapshot) -> Self {
        Self {
            doc_id,
            version: 0,
            document,
            tx_id: Some(new_tx_id()),
            tx_time: Some(LedgerDatetime::now()),
        }
    }

    /// The revision following this one, holding `document`.
    pub fn next(&self, document: Snapshot) -> Self {
        Self {
            doc_id: self.doc_id.clone(),
            version: self.version + 1,
            document,
            tx_id: Some(new_tx_id()),
            tx_time: Some(LedgerDatetime::now()),
        }
    }

    pub fn into_history_record(self) -> Result<HistoryRecord, LedgerError> {
        let version = u64::try_from(self.version).map_err(|_| {
            LedgerError::Gateway(format!(
                "negative version {} for {}",
                self.version, self.doc_id
            ))
        })?;
        Ok(HistoryRecord {
            data: self.document,
            metadata: RevisionMetadata {
                id: self.doc_id,
                version,
                tx_time: self.tx_time,
                tx_id: self.tx_id,
            },
        })
    }
}

fn new_tx_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// DDL for a current-document table.
pub(crate) fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (doc_id TEXT PRIMARY KEY, version BIGINT NOT NULL, document JSONB NOT NULL, tx_id TEXT, tx_time TIMESTAMPTZ)",
        table
    )
}

/// DDL for a history table; one row per `(doc_id, version)`.
pub(crate) fn create_history_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (doc_id TEXT NOT NULL, version BIGINT NOT NULL, document JSONB NOT NULL, tx_id TEXT, tx_time TIMESTAMPTZ, PRIMARY KEY (doc_id, version))",
        table
    )
}
