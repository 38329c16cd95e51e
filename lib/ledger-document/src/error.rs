use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Table or index creation failed. Recovered and logged by `Document`.
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// Insert or update rejected by the gateway.
    #[error("Write error: {0}")]
    Write(String),

    /// Any other gateway failure (reads, connections, lock poisoning).
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Snapshot nested too deeply at: {0}")]
    SnapshotTooDeep(String),

    #[error("Filter has no fields")]
    EmptyFilter,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Reserved field: {0}")]
    ReservedField(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
