//! Export coordinator.
//!
//! [`Logger`] is the front end callers use: it opens transactions and records
//! entries through its [`Registry`], and flushes transactions through the
//! configured [`Exporter`]. Clones share the same registry.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{self, LoggerConfig};
use crate::error::{ExportError, Result, TxLogError};
use crate::exporter::{ConfigMap, ConsoleExporter, Exporter};
use crate::ids::IdGenerator;
use crate::registry::Registry;
use crate::types::{Attributes, Level, TransactionLog};

struct Inner {
    registry: Registry,
    exporter: RwLock<Arc<dyn Exporter>>,
    config: RwLock<Option<Arc<ConfigMap>>>,
    export_timeout: RwLock<Option<Duration>>,
}

/// Transaction-scoped logger.
///
/// # Example
///
/// ```rust,no_run
/// use txlog::{Attributes, Level, Logger};
///
/// # async fn run() -> txlog::Result<()> {
/// let logger = Logger::new(Level::Info);
/// let trace_id = logger.open(Attributes::new());
/// logger.info(&trace_id, "payment accepted", Attributes::new())?;
/// logger.flush(&trace_id).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Create a logger with the given threshold, printing to the console.
    pub fn new(level: Level) -> Self {
        Self::with_registry(Registry::new(level))
    }

    /// Create a logger around an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                exporter: RwLock::new(Arc::new(ConsoleExporter::new())),
                config: RwLock::new(None),
                export_timeout: RwLock::new(None),
            }),
        }
    }

    /// Create a logger with a custom trace/span identifier source.
    pub fn with_ids(level: Level, ids: Arc<dyn IdGenerator>) -> Self {
        Self::with_registry(Registry::with_ids(level, ids))
    }

    /// Use the given exporter for subsequent flushes.
    pub fn with_exporter(self, exporter: impl Exporter + 'static) -> Self {
        self.set_exporter(Arc::new(exporter));
        self
    }

    /// Apply a configuration map: registry settings plus exporter config.
    pub fn with_config(self, config: ConfigMap) -> Self {
        self.set_config(config);
        self
    }

    /// Load and apply a configuration file.
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let map = config::load(path.as_ref())?;
        Ok(self.with_config(map))
    }

    /// Abort exports that take longer than `limit`.
    pub fn with_export_timeout(self, limit: Duration) -> Self {
        *self
            .inner
            .export_timeout
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(limit);
        self
    }

    pub fn set_exporter(&self, exporter: Arc<dyn Exporter>) {
        debug!(exporter = exporter.name(), "Exporter configured");
        *self
            .inner
            .exporter
            .write()
            .unwrap_or_else(PoisonError::into_inner) = exporter;
    }

    /// Replace the exporter configuration and apply any registry settings it names.
    pub fn set_config(&self, config: ConfigMap) {
        let settings = LoggerConfig::from_map(&config);
        if let Some(name) = settings.logger_name {
            self.inner.registry.set_logger_name(name);
        }
        if let Some(name) = settings.service_name {
            self.inner.registry.set_service_name(name);
        }
        if let Some(level) = settings.level {
            self.inner.registry.set_level(level);
        }

        *self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(config));
    }

    pub fn set_level(&self, level: Level) {
        self.inner.registry.set_level(level);
    }

    pub fn set_logger_name(&self, name: impl Into<String>) {
        self.inner.registry.set_logger_name(name);
    }

    pub fn set_service_name(&self, name: impl Into<String>) {
        self.inner.registry.set_service_name(name);
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    fn exporter(&self) -> Arc<dyn Exporter> {
        Arc::clone(
            &self
                .inner
                .exporter
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Current exporter configuration, if any.
    pub fn config(&self) -> Option<Arc<ConfigMap>> {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn export_timeout(&self) -> Option<Duration> {
        *self
            .inner
            .export_timeout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recording
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a transaction and return its trace ID.
    pub fn open(&self, attributes: Attributes) -> String {
        self.inner.registry.open(attributes)
    }

    /// Record an entry. Entries below the threshold are silently dropped.
    pub fn record(
        &self,
        level: Level,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        self.inner
            .registry
            .record(level, trace_id, message, attributes)
    }

    /// Record an entry with a raw numeric severity.
    pub fn record_severity(
        &self,
        severity: u8,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        self.inner
            .registry
            .record_severity(severity, trace_id, message, attributes)
    }

    pub fn debug(
        &self,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        self.record(Level::Debug, trace_id, message, attributes)
    }

    pub fn info(
        &self,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        self.record(Level::Info, trace_id, message, attributes)
    }

    pub fn warning(
        &self,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        self.record(Level::Warning, trace_id, message, attributes)
    }

    pub fn error(
        &self,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        self.record(Level::Error, trace_id, message, attributes)
    }

    /// Snapshot of an open transaction.
    pub fn lookup(&self, trace_id: &str) -> Option<TransactionLog> {
        self.inner.registry.lookup(trace_id)
    }

    /// Trace IDs of all registered transactions.
    pub fn transaction_ids(&self) -> Vec<String> {
        self.inner.registry.transaction_ids()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Export
    // ─────────────────────────────────────────────────────────────────────────

    /// Export one transaction and remove it from the registry.
    ///
    /// On failure the transaction stays registered with its entries intact,
    /// so the caller can retry. The registry lock is not held during export.
    pub async fn flush(&self, trace_id: &str) -> Result<()> {
        let registry = &self.inner.registry;
        let mut checkout = Checkout {
            registry,
            log: Some(registry.checkout(trace_id)?),
        };

        let exporter = self.exporter();
        let config = self.config();
        let entries = checkout.entries();
        let count = entries.len();

        let export = exporter.export(trace_id, entries, config.as_deref());
        let outcome = match self.export_timeout() {
            Some(limit) => tokio::time::timeout(limit, export)
                .await
                .unwrap_or_else(|_| Err(ExportError::Timeout(limit))),
            None => export.await,
        };

        match outcome {
            Ok(()) => {
                checkout.commit();
                info!(
                    trace_id,
                    entries = count,
                    exporter = exporter.name(),
                    "Flushed transaction"
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    trace_id,
                    error = %source,
                    exporter = exporter.name(),
                    "Export failed, keeping transaction"
                );
                Err(TxLogError::Export {
                    trace_id: trace_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Flush every registered transaction concurrently, one task each.
    ///
    /// Waits for all tasks. If any fail, returns the first failure observed;
    /// which one that is when several fail depends on task scheduling. The
    /// remaining failures are logged and discarded. Successful transactions
    /// are removed regardless of the others.
    pub async fn flush_all(&self) -> Result<()> {
        let trace_ids = self.inner.registry.transaction_ids();
        let total = trace_ids.len();

        let mut tasks = JoinSet::new();
        for trace_id in trace_ids {
            let logger = self.clone();
            tasks.spawn(async move { logger.flush(&trace_id).await });
        }

        let mut first_error = None;
        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(TxLogError::TaskFailed(e.to_string())));
            if let Err(err) = result {
                failed += 1;
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(error = %err, "Discarding additional flush error");
                }
            }
        }

        match first_error {
            None => {
                debug!(total, "Flushed all transactions");
                Ok(())
            }
            Some(err) => {
                warn!(total, failed, "Some transactions failed to flush");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("registry", &self.inner.registry)
            .field("exporter", &self.exporter().name())
            .finish()
    }
}

/// A transaction checked out of the registry for the duration of one export.
///
/// Dropped without [`Checkout::commit`], it puts the transaction back, so a
/// failed or cancelled export never loses entries.
struct Checkout<'a> {
    registry: &'a Registry,
    log: Option<TransactionLog>,
}

impl Checkout<'_> {
    fn entries(&self) -> &[crate::types::LogEntry] {
        self.log.as_ref().map_or(&[], |log| log.entries.as_slice())
    }

    fn commit(&mut self) {
        if let Some(log) = self.log.take() {
            self.registry.retire(&log.trace_id);
        }
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if let Some(log) = self.log.take() {
            self.registry.restore(log);
        }
    }
}
