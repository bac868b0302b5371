//! Transaction-scoped structured logging.
//!
//! This crate collects log entries per logical transaction and exports each
//! transaction as a group:
//!
//! - **Types**: `Level`, `LogEntry` and `TransactionLog`
//! - **Registry**: concurrency-safe store of open transactions with
//!   severity filtering
//! - **Logger**: flushes one or all transactions through an `Exporter`
//! - **Exporters**: console, JSON file and text file backends
//!
//! # Usage
//!
//! ```rust,no_run
//! use txlog::{Attributes, JsonFileExporter, Level, Logger};
//!
//! #[tokio::main]
//! async fn main() -> txlog::Result<()> {
//!     let logger = Logger::new(Level::Info)
//!         .with_exporter(JsonFileExporter::new())
//!         .with_config_file("txlog.json")?;
//!
//!     let trace_id = logger.open(Attributes::from([("user".into(), "42".into())]));
//!     logger.debug(&trace_id, "filtered out", Attributes::new())?;
//!     logger.info(&trace_id, "order placed", Attributes::new())?;
//!
//!     logger.flush(&trace_id).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod ids;
pub mod logger;
pub mod registry;
pub mod testing;
pub mod types;

// Re-export main types
pub use config::{LoggerConfig, load as load_config};
pub use error::{ConfigError, ExportError, Result, TxLogError};
pub use exporter::{
    ConfigMap, ConsoleExporter, Exporter, FILENAME_KEY, FILEPATH_KEY, JsonFileExporter,
    TextFileExporter,
};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use logger::Logger;
pub use registry::{DEFAULT_LOGGER_NAME, DEFAULT_SERVICE_NAME, Registry, Settings};
pub use types::{Attributes, Level, LogEntry, TIMESTAMP_FORMAT, TransactionLog};
