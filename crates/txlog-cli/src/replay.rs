//! Replay a JSONL file of log records through a [`Logger`].
//!
//! Each non-blank line is one record:
//!
//! ```json
//! {"transaction": "checkout-42", "level": "INFO", "message": "cart loaded", "attributes": {"items": "3"}}
//! ```
//!
//! Records sharing a `transaction` label go to the same transaction, which is
//! opened on first use with the attribute `label` set to that label.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use txlog::{Attributes, Level, Logger};

/// Attribute key carrying the input label of a transaction.
pub const LABEL_ATTRIBUTE: &str = "label";

/// One input record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplayRecord {
    pub transaction: String,
    pub level: Level,
    pub message: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// What a replay did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub transactions: usize,
    pub records: usize,
}

/// Parse JSONL input, reporting the 1-based line number of a bad record.
pub fn parse(input: &str) -> Result<Vec<ReplayRecord>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid record on line {}", idx + 1))
        })
        .collect()
}

/// Record every input line, then flush all transactions.
pub async fn replay(logger: &Logger, records: Vec<ReplayRecord>) -> Result<ReplaySummary> {
    let mut trace_ids: HashMap<String, String> = HashMap::new();
    let count = records.len();

    for record in records {
        let trace_id = trace_ids
            .entry(record.transaction.clone())
            .or_insert_with(|| {
                logger.open(Attributes::from([(
                    LABEL_ATTRIBUTE.to_string(),
                    record.transaction.clone(),
                )]))
            });

        logger
            .record(record.level, trace_id, record.message, record.attributes)
            .with_context(|| format!("failed to record into '{}'", record.transaction))?;
    }

    tracing::info!(transactions = trace_ids.len(), records = count, "Replayed records, flushing");
    logger.flush_all().await.context("flush failed")?;

    Ok(ReplaySummary {
        transactions: trace_ids.len(),
        records: count,
    })
}
