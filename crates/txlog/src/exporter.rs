//! Exporter trait and the built-in backends.
//!
//! - **Console**: one line per entry to stdout
//! - **JSON file**: the whole transaction as a pretty-printed array in
//!   `<filepath>/<filename>_<traceID>.json`
//! - **Text file**: one line per entry appended to
//!   `<filepath>/<filename>_<traceID>.txt`
//!
//! Lines have the form `[SEVERITY] [TIMESTAMP] <json-encoded entry>`.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::ExportError;
use crate::types::LogEntry;

/// Free-form exporter configuration.
pub type ConfigMap = HashMap<String, String>;

/// Config key naming the output directory of file exporters.
pub const FILEPATH_KEY: &str = "filepath";
/// Config key naming the file prefix of file exporters.
pub const FILENAME_KEY: &str = "filename";

/// A sink for the entries of one transaction.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Export the entries of one transaction.
    ///
    /// An empty `entries` slice must succeed without side effects.
    async fn export(
        &self,
        trace_id: &str,
        entries: &[LogEntry],
        config: Option<&ConfigMap>,
    ) -> Result<(), ExportError>;

    /// Get the name of this exporter.
    fn name(&self) -> &str;
}

/// Render entries as newline-terminated lines.
pub fn render_lines(entries: &[LogEntry]) -> Result<String, ExportError> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_line()?);
        out.push('\n');
    }
    Ok(out)
}

/// Resolve `<filepath>/<filename>_<trace_id>.<ext>` from the configuration.
fn target_path(
    config: Option<&ConfigMap>,
    trace_id: &str,
    extension: &str,
) -> Result<PathBuf, ExportError> {
    let config = config.ok_or(ExportError::MissingConfig)?;
    let dir = config
        .get(FILEPATH_KEY)
        .ok_or(ExportError::MissingKey(FILEPATH_KEY))?;
    let prefix = config
        .get(FILENAME_KEY)
        .ok_or(ExportError::MissingKey(FILENAME_KEY))?;

    Ok(PathBuf::from(dir).join(format!("{prefix}_{trace_id}.{extension}")))
}

/// Prints entries to stdout. Ignores configuration.
#[derive(Debug, Default, Clone)]
pub struct ConsoleExporter;

impl ConsoleExporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Exporter for ConsoleExporter {
    async fn export(
        &self,
        _trace_id: &str,
        entries: &[LogEntry],
        _config: Option<&ConfigMap>,
    ) -> Result<(), ExportError> {
        if entries.is_empty() {
            return Ok(());
        }

        // One write per transaction keeps its lines contiguous.
        let text = render_lines(entries)?;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Writes each transaction to its own JSON file, replacing any previous one.
#[derive(Debug, Default, Clone)]
pub struct JsonFileExporter;

impl JsonFileExporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Exporter for JsonFileExporter {
    async fn export(
        &self,
        trace_id: &str,
        entries: &[LogEntry],
        config: Option<&ConfigMap>,
    ) -> Result<(), ExportError> {
        if entries.is_empty() {
            return Ok(());
        }

        let path = target_path(config, trace_id, "json")?;
        let mut body = serde_json::to_string_pretty(entries)?;
        body.push('\n');
        tokio::fs::write(&path, body).await?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "Wrote JSON log file");
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Appends each transaction's lines to its own text file.
#[derive(Debug, Default, Clone)]
pub struct TextFileExporter;

impl TextFileExporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Exporter for TextFileExporter {
    async fn export(
        &self,
        trace_id: &str,
        entries: &[LogEntry],
        config: Option<&ConfigMap>,
    ) -> Result<(), ExportError> {
        if entries.is_empty() {
            return Ok(());
        }

        let path = target_path(config, trace_id, "txt")?;
        let text = render_lines(entries)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "Appended text log file");
        Ok(())
    }

    fn name(&self) -> &str {
        "text"
    }
}
