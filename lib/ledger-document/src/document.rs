//! The document aggregate: identity, fields and existence-checked saves.

use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::reconstruct::reconstruct;
use crate::{Ledger, LedgerError, LedgerGateway, Query, Revision, Snapshot, Strut, Value, WriteReceipt};

/// Names that describe a document rather than belong to it.
///
/// They never appear in [`Document::fields`], cannot be set, and are dropped
/// from snapshots during hydration.
pub const RESERVED_FIELDS: &[&str] = &["table", "ledger", "index", "meta_id", "strands"];

/// How hydration treats an index value that cannot serve as an id.
#[derive(Debug, Clone, Copy)]
enum Identity {
    /// Caller-supplied snapshots: reject.
    Strict,
    /// Rows read back from the ledger: log and keep.
    Lenient,
}

/// Where a document stands relative to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Never saved by this instance.
    New,
    /// Saved, unchanged since.
    Persisted,
    /// Saved, then modified.
    Dirty,
}

/// An entry in a ledger table.
///
/// Fields live in an explicit [`Strut`]; the identity is kept apart and
/// reappears under the configured index field in [`fields`](Self::fields).
/// The identity keeps its stored form, so a numeric id is written back and
/// looked up as a number.
#[derive(Debug, Clone)]
pub struct Document<G> {
    ledger: Ledger<G>,
    table: String,
    id: String,
    identity: Value,
    meta_id: Option<String>,
    body: Strut,
    dirty: bool,
}

/// Random, non-hyphenated identity.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl<G: LedgerGateway> Document<G> {
    /// Build a document in one of three modes:
    ///
    /// 1. no `id`, no `snapshot`: fresh generated id, no fields
    /// 2. `id` only: fields loaded from the ledger when a record exists
    /// 3. `snapshot` (with or without `id`): fields taken from the snapshot,
    ///    no ledger read
    ///
    /// The table and its index are provisioned first if the ledger does not
    /// list the table; provisioning failures are logged, not returned.
    pub async fn create(
        ledger: &Ledger<G>,
        table: impl Into<String>,
        id: Option<String>,
        snapshot: Option<&Snapshot>,
    ) -> Result<Self, LedgerError> {
        let table = table.into();
        ledger.provision(&table).await;

        let mut document = Self::blank(
            ledger.clone(),
            table,
            id.clone().unwrap_or_else(generate_id),
        );

        match (id, snapshot) {
            (_, Some(snapshot)) => document.hydrate(snapshot, Identity::Strict)?,
            (Some(id), None) => {
                if let Some(row) = document.find_record(JsonValue::String(id.clone())).await? {
                    document.hydrate(&row, Identity::Lenient)?;
                } else {
                    debug!(table = %document.table, id = %id, "Document not found");
                }
            }
            (None, None) => {}
        }

        Ok(document)
    }

    fn blank(ledger: Ledger<G>, table: String, id: String) -> Self {
        Self {
            ledger,
            table,
            identity: Value::String(id.clone()),
            id,
            meta_id: None,
            body: Strut::new(),
            dirty: false,
        }
    }

    /// Build from a row the caller already holds, skipping provisioning.
    ///
    /// Stored rows are taken as they are: an index value that is not a
    /// scalar is logged and kept verbatim rather than failing the caller.
    pub(crate) fn from_row(
        ledger: Ledger<G>,
        table: String,
        row: &Snapshot,
        meta_id: Option<String>,
    ) -> Result<Self, LedgerError> {
        let mut document = Self::blank(ledger, table, generate_id());
        document.hydrate(row, Identity::Lenient)?;
        document.meta_id = meta_id;
        Ok(document)
    }

    fn hydrate(&mut self, snapshot: &Snapshot, mode: Identity) -> Result<(), LedgerError> {
        reconstruct(&mut self.body, snapshot)?;

        for key in RESERVED_FIELDS {
            if self.body.remove(key).is_some() {
                debug!(table = %self.table, field = *key, "Dropped reserved field from snapshot");
            }
        }

        if let Some(value) = self.body.remove(self.ledger.index_field()) {
            match (value.identity(), mode) {
                (Some(id), _) => self.id = id,
                (None, Identity::Strict) => {
                    return Err(LedgerError::InvalidIdentity(format!(
                        "'{}' must be a scalar, got {}",
                        self.ledger.index_field(),
                        value.to_json()
                    )));
                }
                (None, Identity::Lenient) => {
                    warn!(
                        table = %self.table,
                        index = %self.ledger.index_field(),
                        value = %value.to_json(),
                        "Stored row has a non-scalar identity"
                    );
                    self.id = value.to_json().to_string();
                }
            }
            self.identity = value;
        }

        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ledger (namespace) name.
    pub fn ledger(&self) -> &str {
        self.ledger.name()
    }

    /// Name of the identity field.
    pub fn index(&self) -> &str {
        self.ledger.index_field()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Revision link id from the most recent save, if any.
    pub fn meta_id(&self) -> Option<&str> {
        self.meta_id.as_deref()
    }

    pub fn state(&self) -> DocumentState {
        match (&self.meta_id, self.dirty) {
            (None, _) => DocumentState::New,
            (Some(_), false) => DocumentState::Persisted,
            (Some(_), true) => DocumentState::Dirty,
        }
    }

    /// Document content: every user field plus the index field holding the
    /// identity. Reserved names never appear.
    pub fn fields(&self) -> Strut {
        let mut fields = self.body.clone();
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }
        fields.set(self.ledger.index_field(), self.identity.clone());
        fields
    }

    /// Plain form of [`fields`](Self::fields).
    pub fn snapshot(&self) -> Snapshot {
        self.fields().to_snapshot()
    }

    /// [`snapshot`](Self::snapshot) plus the normally hidden metadata.
    pub fn with_metadata(&self) -> Snapshot {
        let mut out = self.snapshot();
        out.insert("table".into(), JsonValue::String(self.table.clone()));
        out.insert("ledger".into(), JsonValue::String(self.ledger().to_string()));
        out.insert("index".into(), JsonValue::String(self.index().to_string()));
        out.insert(
            "meta_id".into(),
            self.meta_id
                .clone()
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
        );
        out
    }

    /// A user field. The identity is available through [`id`](Self::id).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Follow `path` through nested fields.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        self.body.lookup(path)
    }

    /// Set a field, returning its previous value.
    ///
    /// Setting the index field changes the identity and requires a scalar.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, LedgerError> {
        let key = key.into();
        if RESERVED_FIELDS.contains(&key.as_str()) {
            return Err(LedgerError::ReservedField(key));
        }

        let value = value.into();
        let previous = if key == self.ledger.index_field() {
            let id = value
                .identity()
                .ok_or_else(|| LedgerError::InvalidIdentity(format!("'{}' must be a scalar", key)))?;
            self.id = id;
            Some(std::mem::replace(&mut self.identity, value))
        } else {
            self.body.set(key, value)
        };

        self.dirty = true;
        Ok(previous)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.body.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Mutable access to a nested field struct; marks the document modified.
    ///
    /// The path must name at least one field. Top-level fields go through
    /// [`set`](Self::set).
    pub fn nested_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Strut> {
        if path.is_empty() {
            return None;
        }
        let nested = self.body.nested_mut(path)?;
        self.dirty = true;
        Some(nested)
    }

    /// Whether the table holds a record whose index field equals `id`.
    pub async fn exists(&self, id: &str) -> Result<bool, LedgerError> {
        Ok(self.find_record(JsonValue::String(id.to_string())).await?.is_some())
    }

    /// First record whose index field equals `identity`.
    async fn find_record(&self, identity: JsonValue) -> Result<Option<Snapshot>, LedgerError> {
        let index = self.ledger.index_field();
        debug!(table = %self.table, index, identity = %identity, "Checking existence");

        let filter = [(index.to_string(), identity)];
        let rows = self
            .ledger
            .gateway()
            .select_by_equality(&self.table, &filter)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Persist the current fields.
    ///
    /// Looks up the current identity, then updates the existing record or
    /// inserts a new one. The whole field set is written every time.
    pub async fn save(&mut self) -> Result<WriteReceipt, LedgerError> {
        let fields = self.snapshot();
        let index = self.ledger.index_field();
        let gateway = self.ledger.gateway();

        let receipt = if self.find_record(self.identity.to_json()).await?.is_some() {
            debug!(table = %self.table, index, id = %self.id, "Updating document");
            gateway.update(&self.table, index, &fields).await?
        } else {
            debug!(table = %self.table, index, id = %self.id, "Inserting document");
            gateway.insert(&self.table, &fields).await?
        };

        self.meta_id = Some(receipt.document_id.clone());
        self.dirty = false;
        Ok(receipt)
    }

    /// Every revision of this document, oldest first. Empty until saved.
    pub async fn history(&self) -> Result<Vec<Revision<G>>, LedgerError> {
        match &self.meta_id {
            Some(link_id) => {
                Query::new(self.ledger.clone(), self.table.clone())
                    .history(Some(link_id.as_str()))
                    .await
            }
            None => Ok(Vec::new()),
        }
    }
}
