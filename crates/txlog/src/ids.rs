//! Trace and span identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of trace and span identifiers.
pub trait IdGenerator: Send + Sync {
    /// A new transaction identifier.
    fn trace_id(&self) -> String;

    /// A new entry identifier.
    fn span_id(&self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn trace_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn span_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Monotonic counters, prefixed with `trace-` and `span-`.
///
/// Deterministic, useful in tests and demos.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next_trace: AtomicU64,
    next_span: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn trace_id(&self) -> String {
        format!("trace-{}", self.next_trace.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn span_id(&self) -> String {
        format!("span-{}", self.next_span.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_are_distinct() {
        let ids = UuidIds;
        let traces: HashSet<_> = (0..100).map(|_| ids.trace_id()).collect();
        assert_eq!(traces.len(), 100);
        assert_ne!(ids.span_id(), ids.span_id());
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new();
        assert_eq!(ids.trace_id(), "trace-1");
        assert_eq!(ids.trace_id(), "trace-2");
        assert_eq!(ids.span_id(), "span-1");
    }
}
