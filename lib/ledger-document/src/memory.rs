//! In-memory ledger gateway.
//!
//! Keeps current documents and an append-only revision log per table, and
//! journals every statement it executes. Suitable for tests and for embedding
//! where durability is handled elsewhere.
//!
//! Table and column names are sanitized the same way the journaled
//! statements render them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::statement::{self, Statement, sanitize};
use crate::{
    HistoryRecord, LedgerDatetime, LedgerError, LedgerGateway, RevisionMetadata, Snapshot,
    WriteReceipt,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    link_id: String,
    version: u64,
    data: Snapshot,
}

#[derive(Debug, Default)]
struct Table {
    indexes: BTreeSet<String>,
    documents: Vec<StoredDocument>,
    history: Vec<HistoryRecord>,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Table>,
    journal: Vec<Statement>,
    fail_writes: bool,
}

/// A ledger held entirely in memory. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<State>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::Gateway("in-memory ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::Gateway("in-memory ledger lock poisoned".to_string()))
    }

    /// Statements executed so far, oldest first.
    pub fn journal(&self) -> Vec<Statement> {
        self.read().map(|state| state.journal.clone()).unwrap_or_default()
    }

    pub fn clear_journal(&self) {
        if let Ok(mut state) = self.write() {
            state.journal.clear();
        }
    }

    /// Make every subsequent insert and update fail with `LedgerError::Write`.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.write() {
            state.fail_writes = fail;
        }
    }

    /// Indexes provisioned on `table`.
    pub fn indexes(&self, table: &str) -> BTreeSet<String> {
        self.read()
            .ok()
            .and_then(|state| state.tables.get(&sanitize(table)).map(|t| t.indexes.clone()))
            .unwrap_or_default()
    }

    fn select<F>(&self, stmt: Statement, table: &str, keep: F) -> Result<Vec<Snapshot>, LedgerError>
    where
        F: Fn(&Snapshot) -> bool,
    {
        let mut state = self.write()?;
        debug!(statement = %stmt.text, params = stmt.params.len(), "executing");
        state.journal.push(stmt);

        let table = state
            .tables
            .get(&sanitize(table))
            .ok_or_else(|| LedgerError::Gateway(format!("table not found: {}", table)))?;

        Ok(table
            .documents
            .iter()
            .filter(|doc| keep(&doc.data))
            .map(|doc| doc.data.clone())
            .collect())
    }

    fn check_writable(state: &State, table: &str) -> Result<(), LedgerError> {
        if state.fail_writes {
            return Err(LedgerError::Write("writes are disabled".to_string()));
        }
        if !state.tables.contains_key(&sanitize(table)) {
            return Err(LedgerError::Write(format!("table not found: {}", table)));
        }
        Ok(())
    }
}

fn record(doc: &StoredDocument) -> HistoryRecord {
    HistoryRecord {
        data: doc.data.clone(),
        metadata: RevisionMetadata {
            id: doc.link_id.clone(),
            version: doc.version,
            tx_time: Some(LedgerDatetime::now()),
            tx_id: Some(Uuid::new_v4().simple().to_string()),
        },
    }
}

/// Filter entries keyed by the column names their statements render.
fn sanitized<T>(filter: &[(String, T)]) -> Vec<(String, &T)> {
    filter
        .iter()
        .map(|(column, value)| (sanitize(column), value))
        .collect()
}

fn contains_text(value: Option<&JsonValue>, needle: &str) -> bool {
    value
        .and_then(JsonValue::as_str)
        .is_some_and(|text| text.contains(needle))
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn list_tables(&self) -> Result<BTreeSet<String>, LedgerError> {
        Ok(self.read()?.tables.keys().cloned().collect())
    }

    async fn provision_table(&self, table: &str) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        state.journal.push(statement::create_table(table));
        let name = sanitize(table);
        if state.tables.contains_key(&name) {
            return Err(LedgerError::Provisioning(format!(
                "table already exists: {}",
                table
            )));
        }
        state.tables.insert(name, Table::default());
        Ok(())
    }

    async fn provision_index(&self, table: &str, index: &str) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        state.journal.push(statement::create_index(table, index));
        let entry = state
            .tables
            .get_mut(&sanitize(table))
            .ok_or_else(|| LedgerError::Provisioning(format!("table not found: {}", table)))?;
        if !entry.indexes.insert(sanitize(index)) {
            return Err(LedgerError::Provisioning(format!(
                "index already exists: {}({})",
                table, index
            )));
        }
        Ok(())
    }

    async fn insert(&self, table: &str, fields: &Snapshot) -> Result<WriteReceipt, LedgerError> {
        let mut state = self.write()?;
        state.journal.push(statement::insert(table, fields));
        Self::check_writable(&state, table)?;

        let doc = StoredDocument {
            link_id: Uuid::new_v4().simple().to_string(),
            version: 0,
            data: fields.clone(),
        };
        let receipt = WriteReceipt {
            document_id: doc.link_id.clone(),
        };

        if let Some(entry) = state.tables.get_mut(&sanitize(table)) {
            entry.history.push(record(&doc));
            entry.documents.push(doc);
        }
        Ok(receipt)
    }

    async fn update(
        &self,
        table: &str,
        index: &str,
        fields: &Snapshot,
    ) -> Result<WriteReceipt, LedgerError> {
        let lookup = fields
            .get(index)
            .cloned()
            .ok_or_else(|| LedgerError::Write(format!("document has no '{}' field", index)))?;

        let mut state = self.write()?;
        state
            .journal
            .push(statement::update(table, index, fields, lookup.clone()));
        Self::check_writable(&state, table)?;

        let column = sanitize(index);
        let mut receipt = None;
        if let Some(entry) = state.tables.get_mut(&sanitize(table)) {
            let mut revisions = Vec::new();
            for doc in entry
                .documents
                .iter_mut()
                .filter(|doc| doc.data.get(&column) == Some(&lookup))
            {
                doc.version += 1;
                doc.data = fields.clone();
                revisions.push(record(doc));
                receipt.get_or_insert_with(|| WriteReceipt {
                    document_id: doc.link_id.clone(),
                });
            }
            entry.history.extend(revisions);
        }

        receipt.ok_or_else(|| LedgerError::Write(format!("no document with {} = {}", index, lookup)))
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Snapshot>, LedgerError> {
        self.select(statement::select_all(table), table, |_| true)
    }

    async fn select_by_equality(
        &self,
        table: &str,
        filter: &[(String, JsonValue)],
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let columns = sanitized(filter);
        self.select(statement::select_by_equality(table, filter), table, |data| {
            columns
                .iter()
                .all(|(column, value)| data.get(column) == Some(*value))
        })
    }

    async fn select_by_membership(
        &self,
        table: &str,
        filter: &[(String, Vec<JsonValue>)],
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let columns = sanitized(filter);
        self.select(statement::select_by_membership(table, filter), table, |data| {
            columns.iter().all(|(column, values)| {
                data.get(column)
                    .is_some_and(|value| values.contains(value))
            })
        })
    }

    async fn select_by_match(
        &self,
        table: &str,
        filter: &[(String, String)],
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let columns = sanitized(filter);
        self.select(statement::select_by_match(table, filter), table, |data| {
            columns
                .iter()
                .all(|(column, needle)| contains_text(data.get(column), needle))
        })
    }

    async fn select_history(
        &self,
        table: &str,
        link_id: Option<&str>,
    ) -> Result<Vec<HistoryRecord>, LedgerError> {
        let mut state = self.write()?;
        state.journal.push(statement::history(table, link_id));

        let entry = state
            .tables
            .get(&sanitize(table))
            .ok_or_else(|| LedgerError::Gateway(format!("table not found: {}", table)))?;

        Ok(entry
            .history
            .iter()
            .filter(|rec| link_id.is_none_or(|id| rec.metadata.id == id))
            .cloned()
            .collect())
    }
}
