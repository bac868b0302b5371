//! Log data types.
//!
//! A [`TransactionLog`] groups the [`LogEntry`] records emitted while one
//! logical transaction was running. Entries are serialized with the exact
//! field names exporters and downstream readers expect.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TxLogError;

/// String attributes attached to a transaction or an entry.
///
/// Sorted so that serialized output is deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Timestamp layout used for every entry (local time).
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Severity of a log entry. Totally ordered: `Debug < Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Level {
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
}

impl Level {
    /// All levels, lowest first.
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warning, Level::Error];

    /// Upper-case name as it appears in serialized entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    /// Parse a level from a configuration value.
    ///
    /// Unlike [`FromStr`], unrecognized values fall back to [`Level::Info`].
    pub fn from_config_value(value: &str) -> Level {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(value, "Unknown log level in configuration, using INFO");
            Level::Info
        })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = TxLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            other => Err(TxLogError::UnknownLevel(other.to_string())),
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = TxLogError;

    fn try_from(value: u8) -> Result<Self, TxLogError> {
        match value {
            1 => Ok(Level::Debug),
            2 => Ok(Level::Info),
            3 => Ok(Level::Warning),
            4 => Ok(Level::Error),
            other => Err(TxLogError::UnknownLevel(other.to_string())),
        }
    }
}

/// One structured log record belonging to exactly one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was recorded, formatted with [`TIMESTAMP_FORMAT`].
    #[serde(rename = "Timestamp")]
    pub timestamp: String,

    #[serde(rename = "Severity")]
    pub severity: Level,

    #[serde(rename = "Message")]
    pub message: String,

    #[serde(rename = "LoggerName")]
    pub logger_name: String,

    #[serde(rename = "ServiceName")]
    pub service_name: String,

    /// Transaction this entry belongs to.
    #[serde(rename = "TraceID")]
    pub trace_id: String,

    /// Unique identifier for this entry within the process.
    #[serde(rename = "SpanID")]
    pub span_id: String,

    #[serde(rename = "Attributes")]
    pub attributes: Attributes,
}

impl LogEntry {
    /// Render the entry as the single line used by console and text exports:
    /// `[SEVERITY] [TIMESTAMP] <json>` (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("[{}] [{}] {}", self.severity, self.timestamp, json))
    }
}

/// The entries collected for one transaction, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    /// Unique identifier for this transaction.
    pub trace_id: String,

    /// Entries in the order they were recorded.
    pub entries: Vec<LogEntry>,

    /// Attributes supplied when the transaction was opened.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl TransactionLog {
    /// Create an empty transaction log.
    pub fn new(trace_id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            trace_id: trace_id.into(),
            entries: Vec::new(),
            attributes,
        }
    }

    /// Append an entry.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages of all entries, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: Level, message: &str) -> LogEntry {
        LogEntry {
            timestamp: "02.01.2006 15:04:05".to_string(),
            severity: level,
            message: message.to_string(),
            logger_name: "Test".to_string(),
            service_name: "TestService".to_string(),
            trace_id: "123".to_string(),
            span_id: "456".to_string(),
            attributes: Attributes::from([("key1".to_string(), "val1".to_string())]),
        }
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert_eq!(Level::ALL.iter().max(), Some(&Level::Error));
    }

    #[test]
    fn test_level_parsing_is_case_sensitive() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert!(matches!(
            "warning".parse::<Level>(),
            Err(TxLogError::UnknownLevel(v)) if v == "warning"
        ));
    }

    #[test]
    fn test_level_from_config_value_falls_back_to_info() {
        assert_eq!(Level::from_config_value("ERROR"), Level::Error);
        assert_eq!(Level::from_config_value("VERBOSE"), Level::Info);
        assert_eq!(Level::from_config_value(""), Level::Info);
    }

    #[test]
    fn test_level_from_raw() {
        assert_eq!(Level::try_from(1).unwrap(), Level::Debug);
        assert_eq!(Level::try_from(4).unwrap(), Level::Error);
        assert!(Level::try_from(0).is_err());
        assert!(Level::try_from(5).is_err());
    }

    #[test]
    fn test_entry_serialization_field_names() {
        let json = serde_json::to_string(&entry(Level::Info, "info log")).unwrap();
        assert_eq!(
            json,
            r#"{"Timestamp":"02.01.2006 15:04:05","Severity":"INFO","Message":"info log","LoggerName":"Test","ServiceName":"TestService","TraceID":"123","SpanID":"456","Attributes":{"key1":"val1"}}"#
        );
    }

    #[test]
    fn test_entry_line_format() {
        let line = entry(Level::Warning, "careful").to_line().unwrap();
        assert!(line.starts_with("[WARNING] [02.01.2006 15:04:05] {"));
        assert!(line.ends_with("}"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_transaction_log_preserves_order() {
        let mut log = TransactionLog::new("123", Attributes::new());
        log.push(entry(Level::Info, "first"));
        log.push(entry(Level::Info, "first"));
        log.push(entry(Level::Error, "second"));
        assert_eq!(log.messages(), vec!["first", "first", "second"]);
        assert_eq!(log.len(), 3);
    }
}
