//! Read-only queries that materialize results as documents.

use serde_json::Value as JsonValue;

use crate::{Document, Ledger, LedgerError, LedgerGateway, RevisionMetadata, Snapshot, Value};

/// One revision of a document from the audit log.
#[derive(Debug, Clone)]
pub struct Revision<G> {
    /// The revision's content.
    pub document: Document<G>,
    /// Link id, version and transaction details of the revision.
    pub metadata: RevisionMetadata,
}

/// Filter, scan and history operations against one table.
///
/// Result documents are built straight from the returned rows; no further
/// gateway calls are made per result.
#[derive(Debug, Clone)]
pub struct Query<G> {
    ledger: Ledger<G>,
    table: String,
}

impl<G: LedgerGateway> Query<G> {
    pub fn new(ledger: Ledger<G>, table: impl Into<String>) -> Self {
        Self {
            ledger,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every document in the table, in ledger order.
    pub async fn all(&self) -> Result<Vec<Document<G>>, LedgerError> {
        let rows = self.ledger.gateway().select_all(&self.table).await?;
        self.to_documents(rows)
    }

    /// Documents where every given field equals its value.
    ///
    /// An empty filter is rejected with [`LedgerError::EmptyFilter`].
    pub async fn find_by<I, K, V>(&self, fields: I) -> Result<Vec<Document<G>>, LedgerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let filter: Vec<(String, JsonValue)> = fields
            .into_iter()
            .map(|(column, value)| (column.into(), value.into().to_json()))
            .collect();
        if filter.is_empty() {
            return Err(LedgerError::EmptyFilter);
        }

        let rows = self
            .ledger
            .gateway()
            .select_by_equality(&self.table, &filter)
            .await?;
        self.to_documents(rows)
    }

    /// Documents where every given field is one of its listed values.
    ///
    /// Rejects an empty filter and empty value lists.
    pub async fn find_in<I, K, L, V>(&self, fields: I) -> Result<Vec<Document<G>>, LedgerError>
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let filter: Vec<(String, Vec<JsonValue>)> = fields
            .into_iter()
            .map(|(column, values)| {
                let values = values.into_iter().map(|v| v.into().to_json()).collect();
                (column.into(), values)
            })
            .collect();
        if filter.is_empty() {
            return Err(LedgerError::EmptyFilter);
        }
        if let Some((column, _)) = filter.iter().find(|(_, values)| values.is_empty()) {
            return Err(LedgerError::InvalidFilter(format!(
                "no values given for '{}'",
                column
            )));
        }

        let rows = self
            .ledger
            .gateway()
            .select_by_membership(&self.table, &filter)
            .await?;
        self.to_documents(rows)
    }

    /// Documents whose text fields contain every given needle.
    pub async fn find_like<I, K, S>(&self, fields: I) -> Result<Vec<Document<G>>, LedgerError>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<String>,
    {
        let filter: Vec<(String, String)> = fields
            .into_iter()
            .map(|(column, needle)| (column.into(), needle.into()))
            .collect();
        if filter.is_empty() {
            return Err(LedgerError::EmptyFilter);
        }

        let rows = self
            .ledger
            .gateway()
            .select_by_match(&self.table, &filter)
            .await?;
        self.to_documents(rows)
    }

    /// Revision history.
    ///
    /// With a link id, every revision of that document, oldest first. Without
    /// one, the history of every document in the table.
    pub async fn history(&self, link_id: Option<&str>) -> Result<Vec<Revision<G>>, LedgerError> {
        let records = self
            .ledger
            .gateway()
            .select_history(&self.table, link_id)
            .await?;

        records
            .into_iter()
            .map(|record| {
                let document = Document::from_row(
                    self.ledger.clone(),
                    self.table.clone(),
                    &record.data,
                    Some(record.metadata.id.clone()),
                )?;
                Ok(Revision {
                    document,
                    metadata: record.metadata,
                })
            })
            .collect()
    }

    /// Every revision whose content carries `id` in the index field, in log
    /// order. Unlike [`history`](Self::history) this needs no link id, so it
    /// works for documents loaded by id.
    pub async fn history_by_id(&self, id: &str) -> Result<Vec<Revision<G>>, LedgerError> {
        let revisions = self.history(None).await?;
        Ok(revisions
            .into_iter()
            .filter(|revision| revision.document.id() == id)
            .collect())
    }

    fn to_documents(&self, rows: Vec<Snapshot>) -> Result<Vec<Document<G>>, LedgerError> {
        rows.iter()
            .map(|row| Document::from_row(self.ledger.clone(), self.table.clone(), row, None))
            .collect()
    }
}
