//! Testing utilities.
//!
//! Exporters that capture or reject exports, for exercising flush behavior
//! without touching the console or the filesystem.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExportError;
use crate::exporter::{ConfigMap, Exporter};
use crate::types::LogEntry;

/// One captured call to [`Exporter::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub trace_id: String,
    pub entries: Vec<LogEntry>,
    pub config: Option<ConfigMap>,
}

/// An exporter that captures every export for assertions.
///
/// Clones share the captured exports, so a test can keep one handle and give
/// another to the logger.
///
/// # Example
///
/// ```ignore
/// let exporter = RecordingExporter::new();
/// let logger = Logger::new(Level::Info).with_exporter(exporter.clone());
/// // ... flush ...
/// assert_eq!(exporter.export_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingExporter {
    exports: Arc<Mutex<Vec<ExportRecord>>>,
    latency: Option<Duration>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every export by `latency` before capturing it.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All captured exports, in completion order.
    pub fn exports(&self) -> Vec<ExportRecord> {
        self.exports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn export_count(&self) -> usize {
        self.exports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Messages exported for one transaction, in export order.
    pub fn messages_for(&self, trace_id: &str) -> Vec<String> {
        self.exports()
            .into_iter()
            .filter(|record| record.trace_id == trace_id)
            .flat_map(|record| record.entries)
            .map(|entry| entry.message)
            .collect()
    }

    /// Every exported entry across all transactions.
    pub fn all_entries(&self) -> Vec<LogEntry> {
        self.exports()
            .into_iter()
            .flat_map(|record| record.entries)
            .collect()
    }
}

#[async_trait]
impl Exporter for RecordingExporter {
    async fn export(
        &self,
        trace_id: &str,
        entries: &[LogEntry],
        config: Option<&ConfigMap>,
    ) -> Result<(), ExportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.exports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ExportRecord {
                trace_id: trace_id.to_string(),
                entries: entries.to_vec(),
                config: config.cloned(),
            });
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// An exporter that always fails, or fails only for selected transactions.
#[derive(Debug, Clone)]
pub struct FailingExporter {
    message: String,
    trigger: Option<String>,
}

impl FailingExporter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trigger: None,
        }
    }

    /// Fail only transactions containing an entry with this message.
    pub fn only_when_message(mut self, message: impl Into<String>) -> Self {
        self.trigger = Some(message.into());
        self
    }
}

#[async_trait]
impl Exporter for FailingExporter {
    async fn export(
        &self,
        _trace_id: &str,
        entries: &[LogEntry],
        _config: Option<&ConfigMap>,
    ) -> Result<(), ExportError> {
        let triggered = match &self.trigger {
            Some(trigger) => entries.iter().any(|e| &e.message == trigger),
            None => true,
        };

        if triggered {
            Err(ExportError::Backend(self.message.clone()))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "failing"
    }
}
