//! Transaction registry.
//!
//! Owns every open [`TransactionLog`] and applies the severity threshold when
//! entries are recorded. One mutex guards the settings and the map; it is
//! only ever held for map operations, never across an export.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;

use crate::error::{Result, TxLogError};
use crate::ids::{IdGenerator, UuidIds};
use crate::types::{Attributes, Level, LogEntry, TIMESTAMP_FORMAT, TransactionLog};

/// Logger name used when none is configured.
pub const DEFAULT_LOGGER_NAME: &str = "txlog";
/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "txlog-service";

/// Process-wide settings applied to newly recorded entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Minimum severity that gets recorded.
    pub level: Level,
    pub logger_name: String,
    pub service_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: Level::Info,
            logger_name: DEFAULT_LOGGER_NAME.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Open(TransactionLog),
    /// Checked out by an in-flight flush.
    Flushing,
}

#[derive(Debug, Default)]
struct State {
    settings: Settings,
    transactions: HashMap<String, Slot>,
}

/// Concurrency-safe store of open transactions.
pub struct Registry {
    state: Mutex<State>,
    ids: Arc<dyn IdGenerator>,
}

impl Registry {
    /// Create a registry with the given threshold and UUID identifiers.
    pub fn new(level: Level) -> Self {
        Self::with_ids(level, Arc::new(UuidIds))
    }

    /// Create a registry with a custom identifier source.
    pub fn with_ids(level: Level, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Mutex::new(State {
                settings: Settings {
                    level,
                    ..Settings::default()
                },
                transactions: HashMap::new(),
            }),
            ids,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every critical section leaves the map consistent, so a panic in
        // another thread does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new transaction and return its trace ID.
    pub fn open(&self, attributes: Attributes) -> String {
        let mut state = self.lock();

        let mut trace_id = self.ids.trace_id();
        while state.transactions.contains_key(&trace_id) {
            trace_id = self.ids.trace_id();
        }

        let log = TransactionLog::new(trace_id.clone(), attributes);
        state.transactions.insert(trace_id.clone(), Slot::Open(log));
        tracing::debug!(
            trace_id = %trace_id,
            open = state.transactions.len(),
            "Opened transaction"
        );

        trace_id
    }

    /// Record an entry on an open transaction.
    ///
    /// Entries below the configured threshold are dropped without error.
    pub fn record(
        &self,
        level: Level,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        let classify = |threshold: Level| Ok((level >= threshold).then_some(level));
        self.append(trace_id, classify, message.into(), attributes)
    }

    /// Record an entry given a raw numeric severity (1 = DEBUG .. 4 = ERROR).
    ///
    /// Values below the threshold are dropped; values that pass the threshold
    /// but name no level fail with [`TxLogError::UnknownLevel`].
    pub fn record_severity(
        &self,
        severity: u8,
        trace_id: &str,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<()> {
        let classify = |threshold: Level| {
            if severity < threshold as u8 {
                Ok(None)
            } else {
                Level::try_from(severity).map(Some)
            }
        };
        self.append(trace_id, classify, message.into(), attributes)
    }

    fn append(
        &self,
        trace_id: &str,
        classify: impl FnOnce(Level) -> Result<Option<Level>>,
        message: String,
        attributes: Attributes,
    ) -> Result<()> {
        let mut guard = self.lock();
        let State {
            settings,
            transactions,
        } = &mut *guard;

        let slot = transactions
            .get_mut(trace_id)
            .ok_or_else(|| TxLogError::UnknownTransaction(trace_id.to_string()))?;

        let Some(level) = classify(settings.level)? else {
            return Ok(());
        };

        let Slot::Open(log) = slot else {
            return Err(TxLogError::TransactionBusy(trace_id.to_string()));
        };

        log.push(LogEntry {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            severity: level,
            message,
            logger_name: settings.logger_name.clone(),
            service_name: settings.service_name.clone(),
            trace_id: trace_id.to_string(),
            span_id: self.ids.span_id(),
            attributes,
        });
        tracing::trace!(trace_id, %level, entries = log.len(), "Recorded entry");

        Ok(())
    }

    /// Snapshot of an open transaction.
    ///
    /// Returns `None` if the ID is unknown or the transaction is being flushed.
    pub fn lookup(&self, trace_id: &str) -> Option<TransactionLog> {
        match self.lock().transactions.get(trace_id) {
            Some(Slot::Open(log)) => Some(log.clone()),
            _ => None,
        }
    }

    /// Whether the ID names a registered transaction (open or flushing).
    pub fn contains(&self, trace_id: &str) -> bool {
        self.lock().transactions.contains_key(trace_id)
    }

    /// Remove an open transaction, returning it.
    ///
    /// A transaction with an export in flight is left in place and `None` is
    /// returned; the flush decides its fate.
    pub fn remove(&self, trace_id: &str) -> Option<TransactionLog> {
        let mut state = self.lock();
        match state.transactions.get(trace_id) {
            Some(Slot::Open(_)) => match state.transactions.remove(trace_id) {
                Some(Slot::Open(log)) => Some(log),
                _ => None,
            },
            _ => None,
        }
    }

    /// Take a transaction out for export, marking it as flushing.
    ///
    /// At most one checkout per transaction can be outstanding.
    pub fn checkout(&self, trace_id: &str) -> Result<TransactionLog> {
        let mut state = self.lock();
        let slot = state
            .transactions
            .get_mut(trace_id)
            .ok_or_else(|| TxLogError::UnknownTransaction(trace_id.to_string()))?;

        match std::mem::replace(slot, Slot::Flushing) {
            Slot::Open(log) => Ok(log),
            Slot::Flushing => Err(TxLogError::TransactionBusy(trace_id.to_string())),
        }
    }

    /// Return a checked-out transaction after a failed export.
    pub fn restore(&self, log: TransactionLog) {
        let mut state = self.lock();
        state.transactions.insert(log.trace_id.clone(), Slot::Open(log));
    }

    /// Drop a checked-out transaction after a successful export.
    pub fn retire(&self, trace_id: &str) {
        let mut state = self.lock();
        if let Some(Slot::Flushing) = state.transactions.get(trace_id) {
            state.transactions.remove(trace_id);
        }
    }

    /// Point-in-time snapshot of all registered trace IDs.
    pub fn transaction_ids(&self) -> Vec<String> {
        self.lock().transactions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().transactions.is_empty()
    }

    /// Copy of the current settings.
    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn level(&self) -> Level {
        self.lock().settings.level
    }

    pub fn set_level(&self, level: Level) {
        self.lock().settings.level = level;
    }

    pub fn logger_name(&self) -> String {
        self.lock().settings.logger_name.clone()
    }

    pub fn set_logger_name(&self, name: impl Into<String>) {
        self.lock().settings.logger_name = name.into();
    }

    pub fn service_name(&self) -> String {
        self.lock().settings.service_name.clone()
    }

    pub fn set_service_name(&self, name: impl Into<String>) {
        self.lock().settings.service_name = name.into();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Registry")
            .field("settings", &state.settings)
            .field("transactions", &state.transactions.len())
            .finish()
    }
}
