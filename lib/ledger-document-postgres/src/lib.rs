//! PostgreSQL gateway for ledger-document.
//!
//! Emulates a managed ledger on plain PostgreSQL: each ledger is a schema,
//! each table keeps its current documents as JSONB rows, and every write also
//! appends a revision to a companion `<table>__history` table.
//!
//! # Usage
//!
//! ```text
//! use ledger_document::{Ledger, LedgerConfig, LedgerConnection};
//! use ledger_document_postgres::PgLedger;
//!
//! let config = LedgerConfig::from_env()?;
//! let gateway = PgLedger::connect("postgres://localhost/ledgers", &config).await?;
//! gateway.initialize().await?;
//!
//! let ledger = Ledger::new(gateway, config);
//! let mut doc = ledger.document("people").await?;
//! doc.set("team", "InnoLab")?;
//! doc.save().await?;
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod bind;
mod gateway;
mod row;

pub use bind::{escape_like, number_placeholders, quote_ident, quote_literal};
pub use gateway::{HISTORY_SUFFIX, PgLedger};

// Re-export core types for convenience
pub use ledger_document::{
    ConnectionConfig, HistoryRecord, LedgerConfig, LedgerConnection, LedgerError, LedgerGateway,
    Snapshot, WriteReceipt,
};
