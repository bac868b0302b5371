//! Integration tests for txlog
//!
//! Exercises the public API end to end: recording, filtering, flushing
//! through the built-in file exporters, and concurrent flush-all.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use tempfile::{NamedTempFile, tempdir};
use txlog::testing::{FailingExporter, RecordingExporter};
use txlog::{
    Attributes, ConfigMap, ExportError, JsonFileExporter, Level, LogEntry, Logger, SequentialIds,
    TextFileExporter, TxLogError,
};

fn attrs(key: &str, value: &str) -> Attributes {
    Attributes::from([(key.to_string(), value.to_string())])
}

fn file_config(dir: &std::path::Path, prefix: &str) -> ConfigMap {
    ConfigMap::from([
        ("filepath".to_string(), dir.display().to_string()),
        ("filename".to_string(), prefix.to_string()),
    ])
}

/// Threshold WARNING keeps only WARNING and ERROR, in call order.
#[tokio::test]
async fn test_warning_threshold_scenario() {
    let exporter = RecordingExporter::new();
    let logger = Logger::new(Level::Warning).with_exporter(exporter.clone());

    let id = logger.open(Attributes::new());
    logger.debug(&id, "x", Attributes::new()).unwrap();
    logger.warning(&id, "y", Attributes::new()).unwrap();
    logger.error(&id, "z", Attributes::new()).unwrap();

    assert_eq!(logger.lookup(&id).unwrap().messages(), vec!["y", "z"]);

    logger.flush(&id).await.unwrap();
    assert_eq!(exporter.messages_for(&id), vec!["y", "z"]);
}

#[tokio::test]
async fn test_record_after_flush_fails() {
    let logger = Logger::new(Level::Info).with_exporter(RecordingExporter::new());

    let id = logger.open(Attributes::new());
    logger.info(&id, "before", Attributes::new()).unwrap();
    logger.flush(&id).await.unwrap();

    assert!(matches!(
        logger.info(&id, "after", Attributes::new()),
        Err(TxLogError::UnknownTransaction(_))
    ));
    assert!(matches!(
        logger.debug(&id, "after", Attributes::new()),
        Err(TxLogError::UnknownTransaction(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flush_all_two_transactions() {
    let exporter = RecordingExporter::new();
    let logger = Logger::new(Level::Info).with_exporter(exporter.clone());

    let a = logger.open(attrs("name", "a"));
    let b = logger.open(attrs("name", "b"));
    logger.info(&a, "from a", Attributes::new()).unwrap();
    logger.info(&b, "from b", Attributes::new()).unwrap();

    logger.flush_all().await.unwrap();

    assert_eq!(exporter.export_count(), 2);
    assert_eq!(exporter.messages_for(&a), vec!["from a"]);
    assert_eq!(exporter.messages_for(&b), vec!["from b"]);
    assert!(logger.transaction_ids().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flush_all_exports_union_of_entries() {
    let exporter = RecordingExporter::new();
    let logger = Logger::with_ids(Level::Debug, Arc::new(SequentialIds::new()))
        .with_exporter(exporter.clone());

    let mut recorded = HashSet::new();
    for t in 0..25 {
        let id = logger.open(Attributes::new());
        for i in 0..4 {
            let message = format!("{t}:{i}");
            logger
                .info(&id, message.clone(), Attributes::new())
                .unwrap();
            recorded.insert((id.clone(), message));
        }
    }

    logger.flush_all().await.unwrap();

    let exported: HashSet<(String, String)> = exporter
        .all_entries()
        .into_iter()
        .map(|e| (e.trace_id, e.message))
        .collect();
    assert_eq!(exported, recorded);
    assert!(logger.registry().is_empty());

    // Emission order within each transaction survives the fan-out.
    for record in exporter.exports() {
        let order: Vec<u32> = record
            .entries
            .iter()
            .filter_map(|e| e.message.split(':').nth(1)?.parse().ok())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recording_from_tasks() {
    let logger = Logger::new(Level::Debug).with_exporter(RecordingExporter::new());
    let id = logger.open(Attributes::new());

    let mut tasks = tokio::task::JoinSet::new();
    for t in 0..8 {
        let logger = logger.clone();
        let id = id.clone();
        tasks.spawn(async move {
            for i in 0..25 {
                logger
                    .info(&id, format!("{t}-{i}"), Attributes::new())
                    .unwrap();
            }
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    assert_eq!(logger.lookup(&id).unwrap().len(), 200);
}

#[tokio::test]
async fn test_failed_flush_all_leaves_transactions() {
    let logger = Logger::new(Level::Info).with_exporter(FailingExporter::new("mock error"));

    let a = logger.open(Attributes::new());
    let b = logger.open(Attributes::new());
    logger.info(&a, "a1", Attributes::new()).unwrap();
    logger.info(&b, "b1", Attributes::new()).unwrap();

    let err = logger.flush_all().await.unwrap_err();
    assert!(matches!(err, TxLogError::Export { .. }));
    assert_eq!(logger.lookup(&a).unwrap().messages(), vec!["a1"]);
    assert_eq!(logger.lookup(&b).unwrap().messages(), vec!["b1"]);
}

#[tokio::test]
async fn test_json_exporter_through_logger() {
    let dir = tempdir().unwrap();
    let logger = Logger::new(Level::Debug)
        .with_exporter(JsonFileExporter::new())
        .with_config(file_config(dir.path(), "test_success"));

    let id = logger.open(Attributes::new());
    logger
        .info(&id, "info message", attrs("key1", "val1"))
        .unwrap();
    logger
        .debug(&id, "debug message", attrs("key2", "val2"))
        .unwrap();
    logger.flush(&id).await.unwrap();

    let path = dir.path().join(format!("test_success_{id}.json"));
    let entries: Vec<LogEntry> =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "info message");
    assert_eq!(entries[0].severity, Level::Info);
    assert_eq!(entries[0].trace_id, id);
    assert_eq!(entries[1].attributes, attrs("key2", "val2"));
    assert_ne!(entries[0].span_id, entries[1].span_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_text_exporter_flush_all() {
    let dir = tempdir().unwrap();
    let logger = Logger::new(Level::Info)
        .with_exporter(TextFileExporter::new())
        .with_config(file_config(dir.path(), "run"));

    let ids: Vec<String> = (0..3)
        .map(|i| {
            let id = logger.open(Attributes::new());
            logger
                .warning(&id, format!("w{i}"), Attributes::new())
                .unwrap();
            id
        })
        .collect();

    logger.flush_all().await.unwrap();

    for id in ids {
        let text = std::fs::read_to_string(dir.path().join(format!("run_{id}.txt"))).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("[WARNING] ["));
        assert!(text.contains(&format!("\"TraceID\":\"{id}\"")));
    }
}

#[tokio::test]
async fn test_file_exporter_without_config_keeps_transaction() {
    let logger = Logger::new(Level::Info).with_exporter(JsonFileExporter::new());

    let id = logger.open(Attributes::new());
    logger.info(&id, "pending", Attributes::new()).unwrap();

    let err = logger.flush(&id).await.unwrap_err();
    assert!(matches!(
        err,
        TxLogError::Export { source: ExportError::MissingConfig, .. }
    ));
    assert_eq!(logger.lookup(&id).unwrap().len(), 1);

    // An empty transaction flushes fine without config.
    let empty = logger.open(Attributes::new());
    logger.flush(&empty).await.unwrap();
    assert!(logger.lookup(&empty).is_none());
}

#[tokio::test]
async fn test_config_file() {
    let dir = tempdir().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"filepath": "{}", "filename": "cfg", "loggerName": "Test", "serviceName": "TestService", "level": "DEBUG"}}"#,
        dir.path().display()
    )
    .unwrap();

    let logger = Logger::new(Level::Error)
        .with_exporter(JsonFileExporter::new())
        .with_config_file(file.path())
        .unwrap();

    let id = logger.open(Attributes::new());
    logger.debug(&id, "visible", Attributes::new()).unwrap();

    let entry = &logger.lookup(&id).unwrap().entries[0];
    assert_eq!(entry.logger_name, "Test");
    assert_eq!(entry.service_name, "TestService");

    logger.flush(&id).await.unwrap();
    assert!(dir.path().join(format!("cfg_{id}.json")).exists());
}

#[tokio::test]
async fn test_config_file_errors() {
    let missing = Logger::new(Level::Info).with_config_file("no/such/config.json");
    assert!(matches!(missing, Err(TxLogError::Config(_))));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    let malformed = Logger::new(Level::Info).with_config_file(file.path());
    assert!(matches!(malformed, Err(TxLogError::Config(_))));
}
