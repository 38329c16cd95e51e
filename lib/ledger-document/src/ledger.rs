use tracing::{debug, error};

use crate::statement::sanitize;
use crate::{Document, LedgerConfig, LedgerError, LedgerGateway, Query, Snapshot};

/// A gateway bound to one ledger configuration.
///
/// Cheap to clone; every `Document` and `Query` carries its own copy.
#[derive(Debug, Clone)]
pub struct Ledger<G> {
    gateway: G,
    config: LedgerConfig,
}

impl<G: LedgerGateway> Ledger<G> {
    pub fn new(gateway: G, config: LedgerConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Ledger (namespace) name.
    pub fn name(&self) -> &str {
        &self.config.ledger
    }

    pub fn index_field(&self) -> &str {
        &self.config.index_field
    }

    /// A new document with a generated id and no fields.
    pub async fn document(&self, table: impl Into<String>) -> Result<Document<G>, LedgerError> {
        Document::create(self, table, None, None).await
    }

    /// The document stored under `id`, or a document holding only `id` if
    /// there is none.
    pub async fn load(
        &self,
        table: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Document<G>, LedgerError> {
        Document::create(self, table, Some(id.into()), None).await
    }

    /// A document populated from `snapshot` without reading the ledger.
    pub async fn document_from_snapshot(
        &self,
        table: impl Into<String>,
        snapshot: &Snapshot,
    ) -> Result<Document<G>, LedgerError> {
        Document::create(self, table, None, Some(snapshot)).await
    }

    pub fn query(&self, table: impl Into<String>) -> Query<G> {
        Query::new(self.clone(), table)
    }

    /// Create `table` and its index unless the ledger already lists it.
    /// Gateways list tables under their sanitized names.
    ///
    /// Failures are logged and otherwise ignored.
    pub(crate) async fn provision(&self, table: &str) {
        let tables = match self.gateway.list_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                error!(ledger = %self.config.ledger, table, error = %e, "Failed to list tables");
                return;
            }
        };
        if tables.contains(&sanitize(table)) {
            return;
        }

        debug!(ledger = %self.config.ledger, table, index = %self.config.index_field, "Provisioning table");
        let result = match self.gateway.provision_table(table).await {
            Ok(()) => {
                self.gateway
                    .provision_index(table, &self.config.index_field)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(ledger = %self.config.ledger, table, error = %e, "Failed to provision table");
        }
    }
}
