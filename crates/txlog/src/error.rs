//! Error types for transaction logging.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for registry and flush operations.
pub type Result<T> = std::result::Result<T, TxLogError>;

/// Errors returned by the registry and the export coordinator.
#[derive(Debug, Error)]
pub enum TxLogError {
    /// The trace ID does not name an open transaction.
    #[error("invalid trace ID: {0}")]
    UnknownTransaction(String),

    /// A severity outside DEBUG/INFO/WARNING/ERROR was used.
    #[error("unknown log level: {0}")]
    UnknownLevel(String),

    /// The transaction is currently being exported.
    #[error("transaction {0} has an export in flight")]
    TransactionBusy(String),

    /// The exporter reported a failure; the transaction is still registered.
    #[error("export of transaction {trace_id} failed: {source}")]
    Export {
        trace_id: String,
        #[source]
        source: ExportError,
    },

    /// The configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A flush task panicked or was cancelled.
    #[error("flush task failed: {0}")]
    TaskFailed(String),
}

/// Errors reported by exporter backends.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no config provided")]
    MissingConfig,

    #[error("no {0} in config")]
    MissingKey(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export timed out after {0:?}")]
    Timeout(Duration),

    /// Failure reported by a custom backend.
    #[error("{0}")]
    Backend(String),
}

impl ExportError {
    /// Whether the failure is caused by missing or incomplete configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, ExportError::MissingConfig | ExportError::MissingKey(_))
    }
}

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
