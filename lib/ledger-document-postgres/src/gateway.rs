//! PostgreSQL implementation of LedgerGateway.

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// Suffix of the table holding a table's revisions.
pub const HISTORY_SUFFIX: &str = "__history";

use std::collections::BTreeSet;
use std::ops::Deref;

use async_trait::async_trait;
use ledger_document::clause;
use ledger_document::statement::sanitize;
use ledger_document::{
    ConnectionConfig, HistoryRecord, LedgerConfig, LedgerConnection, LedgerError, LedgerGateway,
    Snapshot, WriteReceipt,
};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use tracing::debug;

use crate::bind::{
    bind_columns, bind_json_value, build_insert_sql, deserialize_row, escape_like,
    number_placeholders, quote_ident, quote_literal,
};
use crate::row::{
    COLUMN_TYPES, COLUMNS, MUTABLE_COLUMN_TYPES, MUTABLE_COLUMNS, StoredRow, create_history_sql,
    create_table_sql,
};

fn gateway_error(e: sqlx::Error) -> LedgerError {
    LedgerError::Gateway(e.to_string())
}

fn write_error(e: sqlx::Error) -> LedgerError {
    LedgerError::Write(e.to_string())
}

fn provisioning_error(e: sqlx::Error) -> LedgerError {
    LedgerError::Provisioning(e.to_string())
}

/// A ledger emulated in one PostgreSQL schema.
#[derive(Clone, Debug)]
pub struct PgLedger {
    pool: sqlx::PgPool,
    schema: String,
}

impl PgLedger {
    /// Use an existing pool for the ledger named in `ledger`.
    pub fn new(pool: sqlx::PgPool, ledger: &LedgerConfig) -> Self {
        Self {
            pool,
            schema: sanitize(&ledger.ledger),
        }
    }

    /// Get the inner sqlx::PgPool.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Schema holding this ledger's tables.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn table_ident(&self, table: &str) -> String {
        qualified(&self.schema, table)
    }

    fn history_ident(&self, table: &str) -> String {
        qualified(&self.schema, &format!("{}{}", sanitize(table), HISTORY_SUFFIX))
    }

    async fn fetch_rows(&self, sql: &str, args: PgArguments) -> Result<Vec<StoredRow>, LedgerError> {
        debug!(sql, "executing");
        let rows = sqlx::query_with(sql, args)
            .fetch_all(&self.pool)
            .await
            .map_err(gateway_error)?;
        rows.iter().map(deserialize_row::<StoredRow>).collect()
    }

    async fn fetch_documents(
        &self,
        sql: &str,
        args: PgArguments,
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let rows = self.fetch_rows(sql, args).await?;
        Ok(rows.into_iter().map(|row| row.document).collect())
    }

    async fn write_row(
        tx: &mut Transaction<'static, Postgres>,
        table: &str,
        row: &StoredRow,
    ) -> Result<(), LedgerError> {
        let mut args = PgArguments::default();
        bind_columns(&mut args, row, COLUMNS, COLUMN_TYPES)?;

        let sql = build_insert_sql(table, COLUMNS);
        debug!(sql = %sql, "executing");
        sqlx::query_with(&sql, args)
            .execute(&mut **tx)
            .await
            .map_err(write_error)?;
        Ok(())
    }
}

impl Deref for PgLedger {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

/// `"schema"."table"` with the table name sanitized.
fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(&sanitize(table)))
}

/// JSONB expression selecting a document field.
fn json_path(column: &str) -> String {
    format!("document -> {}", quote_literal(&sanitize(column)))
}

/// Text expression selecting a document field.
fn text_path(column: &str) -> String {
    format!("document ->> {}", quote_literal(&sanitize(column)))
}

/// `SELECT *` over `table` restricted by an optional clause, with numbered
/// placeholders.
fn select_sql(table: &str, clause: Option<String>) -> String {
    let sql = match clause {
        Some(clause) => format!("SELECT * FROM {} {}", table, clause.trim_end()),
        None => format!("SELECT * FROM {}", table),
    };
    number_placeholders(&sql)
}

fn update_sql(table: &str) -> String {
    let set = clause::set_assignment(MUTABLE_COLUMNS).unwrap_or_default();
    let filter = clause::where_equals(&["doc_id"]).unwrap_or_default();
    number_placeholders(&format!("UPDATE {} {}{}", table, set, filter.trim_end()))
}

fn index_sql(table: &str, qualified_table: &str, index: &str) -> String {
    let name = format!("{}_{}_idx", sanitize(table), sanitize(index));
    format!(
        "CREATE INDEX {} ON {} (({}))",
        quote_ident(&name),
        qualified_table,
        json_path(index)
    )
}

fn history_sql(history_table: &str, by_link: bool) -> String {
    let filter = if by_link {
        clause::where_equals(&["doc_id"])
    } else {
        None
    };
    format!(
        "{} ORDER BY tx_time ASC, version ASC",
        select_sql(history_table, filter)
    )
}

#[async_trait]
impl LedgerGateway for PgLedger {
    async fn list_tables(&self) -> Result<BTreeSet<String>, LedgerError> {
        let sql = "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema::text = $1";
        let rows = sqlx::query(sql)
            .bind(self.schema.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(gateway_error)?;

        let mut tables = BTreeSet::new();
        for row in rows {
            let name: String = row.try_get("table_name").map_err(gateway_error)?;
            if !name.ends_with(HISTORY_SUFFIX) {
                tables.insert(name);
            }
        }
        Ok(tables)
    }

    async fn provision_table(&self, table: &str) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await.map_err(provisioning_error)?;
        for sql in [
            create_table_sql(&self.table_ident(table)),
            create_history_sql(&self.history_ident(table)),
        ] {
            debug!(sql = %sql, "executing");
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(provisioning_error)?;
        }
        tx.commit().await.map_err(provisioning_error)
    }

    async fn provision_index(&self, table: &str, index: &str) -> Result<(), LedgerError> {
        let sql = index_sql(table, &self.table_ident(table), index);
        debug!(sql = %sql, "executing");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(provisioning_error)?;
        Ok(())
    }

    async fn insert(&self, table: &str, fields: &Snapshot) -> Result<WriteReceipt, LedgerError> {
        let row = StoredRow::first(uuid::Uuid::new_v4().simple().to_string(), fields.clone());

        let mut tx = self.pool.begin().await.map_err(write_error)?;
        Self::write_row(&mut tx, &self.table_ident(table), &row).await?;
        Self::write_row(&mut tx, &self.history_ident(table), &row).await?;
        tx.commit().await.map_err(write_error)?;

        Ok(WriteReceipt {
            document_id: row.doc_id,
        })
    }

    async fn update(
        &self,
        table: &str,
        index: &str,
        fields: &Snapshot,
    ) -> Result<WriteReceipt, LedgerError> {
        let lookup = fields
            .get(index)
            .ok_or_else(|| LedgerError::Write(format!("document has no '{}' field", index)))?;

        let table_ident = self.table_ident(table);
        let select = format!(
            "{} FOR UPDATE",
            select_sql(&table_ident, clause::where_equals(&[json_path(index)]))
        );
        let mut args = PgArguments::default();
        bind_json_value(&mut args, lookup, "jsonb")?;

        let mut tx = self.pool.begin().await.map_err(write_error)?;
        debug!(sql = %select, "executing");
        let rows = sqlx::query_with(&select, args)
            .fetch_all(&mut *tx)
            .await
            .map_err(write_error)?;
        let current = rows
            .iter()
            .map(deserialize_row::<StoredRow>)
            .collect::<Result<Vec<_>, _>>()?;

        let Some(first) = current.first() else {
            return Err(LedgerError::Write(format!(
                "no document with {} = {}",
                index, lookup
            )));
        };
        let receipt = WriteReceipt {
            document_id: first.doc_id.clone(),
        };

        let update = update_sql(&table_ident);
        let history_ident = self.history_ident(table);
        for row in &current {
            let next = row.next(fields.clone());

            let mut args = PgArguments::default();
            bind_columns(&mut args, &next, MUTABLE_COLUMNS, MUTABLE_COLUMN_TYPES)?;
            bind_json_value(&mut args, &JsonValue::String(next.doc_id.clone()), "text")?;
            debug!(sql = %update, "executing");
            sqlx::query_with(&update, args)
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;

            Self::write_row(&mut tx, &history_ident, &next).await?;
        }
        tx.commit().await.map_err(write_error)?;

        Ok(receipt)
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Snapshot>, LedgerError> {
        let sql = select_sql(&self.table_ident(table), None);
        self.fetch_documents(&sql, PgArguments::default()).await
    }

    async fn select_by_equality(
        &self,
        table: &str,
        filter: &[(String, JsonValue)],
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let columns: Vec<String> = filter.iter().map(|(column, _)| json_path(column)).collect();
        let sql = select_sql(&self.table_ident(table), clause::where_equals(&columns));

        let mut args = PgArguments::default();
        for (_, value) in filter {
            bind_json_value(&mut args, value, "jsonb")?;
        }
        self.fetch_documents(&sql, args).await
    }

    async fn select_by_membership(
        &self,
        table: &str,
        filter: &[(String, Vec<JsonValue>)],
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let columns: Vec<(String, usize)> = filter
            .iter()
            .map(|(column, values)| (json_path(column), values.len()))
            .collect();
        let sql = select_sql(&self.table_ident(table), clause::where_in(&columns));

        let mut args = PgArguments::default();
        for value in filter.iter().flat_map(|(_, values)| values) {
            bind_json_value(&mut args, value, "jsonb")?;
        }
        self.fetch_documents(&sql, args).await
    }

    async fn select_by_match(
        &self,
        table: &str,
        filter: &[(String, String)],
    ) -> Result<Vec<Snapshot>, LedgerError> {
        let columns: Vec<String> = filter.iter().map(|(column, _)| text_path(column)).collect();
        let sql = select_sql(&self.table_ident(table), clause::where_like(&columns));

        let mut args = PgArguments::default();
        for (_, needle) in filter {
            let pattern = JsonValue::String(format!("%{}%", escape_like(needle)));
            bind_json_value(&mut args, &pattern, "text")?;
        }
        self.fetch_documents(&sql, args).await
    }

    async fn select_history(
        &self,
        table: &str,
        link_id: Option<&str>,
    ) -> Result<Vec<HistoryRecord>, LedgerError> {
        let sql = history_sql(&self.history_ident(table), link_id.is_some());

        let mut args = PgArguments::default();
        if let Some(link_id) = link_id {
            bind_json_value(&mut args, &JsonValue::String(link_id.to_string()), "text")?;
        }

        self.fetch_rows(&sql, args)
            .await?
            .into_iter()
            .map(StoredRow::into_history_record)
            .collect()
    }
}

#[async_trait]
impl LedgerConnection for PgLedger {
    async fn connect(
        config: impl Into<ConnectionConfig> + Send,
        ledger: &LedgerConfig,
    ) -> Result<Self, LedgerError> {
        let url = match config.into() {
            ConnectionConfig::Url(url) => url,
        };

        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(&url)
            .await
            .map_err(gateway_error)?;
        Ok(Self::new(pool, ledger))
    }

    async fn initialize(&self) -> Result<(), LedgerError> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema));
        debug!(sql = %sql, "executing");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(gateway_error)?;
        Ok(())
    }
}
