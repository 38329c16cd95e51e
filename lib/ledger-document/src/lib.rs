//! Ledger Document - Document mapping over a managed ledger database.
//!
//! Application code works with documents (nested key/value records with an
//! identity) while this crate renders the ledger's SQL-like statements,
//! provisions tables on first use, and reads revision history.
//!
//! # Core Concepts
//!
//! - **Document**: a record in a named table, identified by the value of its
//!   index field (`id` unless configured otherwise).
//! - **Strut**: a navigable nested object; plain snapshots are rebuilt into
//!   trees of `Strut`s so `doc.get_path(&["a", "b", "c"])` works at any depth.
//! - **Revision**: one entry of a document's audit trail, tied to the others
//!   by a stable link id (`meta_id`).
//!
//! # Traits
//!
//! - [`LedgerGateway`]: the boundary to a ledger backend
//! - [`LedgerConnection`]: connecting to and initializing a backend
//!
//! [`InMemoryLedger`] implements the gateway for tests and embedding.

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

pub mod clause;
mod config;
mod document;
mod error;
mod gateway;
mod ledger;
mod memory;
mod query;
pub mod reconstruct;
pub mod statement;
mod strut;
mod time;
mod value;

pub use config::{ConnectionConfig, DEFAULT_INDEX_FIELD, INDEX_FIELD_ENV, LEDGER_ENV, LedgerConfig};
pub use document::{Document, DocumentState, RESERVED_FIELDS, generate_id};
pub use error::LedgerError;
pub use gateway::{HistoryRecord, LedgerConnection, LedgerGateway, RevisionMetadata, WriteReceipt};
pub use ledger::Ledger;
pub use memory::InMemoryLedger;
pub use query::{Query, Revision};
pub use strut::Strut;
pub use time::LedgerDatetime;
pub use value::{Snapshot, Value};
