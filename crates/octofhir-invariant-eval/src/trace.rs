//! Trace observers
//!
//! FHIRPath `trace(label, projection)` output is routed to an observer instead
//! of being printed by the engine.

use crate::engine::CallSite;
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// Label used by the contained-reference template for unreferenced ids
pub const UNMATCHED_LABEL: &str = "unmatched";

/// One `trace()` emission
#[derive(Debug, Clone, Copy)]
pub struct TraceEvent<'a> {
    pub site: CallSite<'a>,
    pub label: &'a str,
    pub values: &'a [Value],
}

/// Receives trace output from the engine
pub trait TraceObserver: Send + Sync {
    fn on_trace(&self, event: &TraceEvent<'_>);
}

/// Writes traces to the `debug` log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceObserver;

impl TraceObserver for LogTraceObserver {
    fn on_trace(&self, event: &TraceEvent<'_>) {
        debug!(
            "trace '{}' from {} (request {}): {}",
            event.label,
            event.site.key,
            event.site.index,
            Value::from(event.values.to_vec())
        );
    }
}

/// An owned trace emission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub index: usize,
    pub key: String,
    pub path: String,
    pub label: String,
    pub values: Vec<Value>,
}

impl TraceRecord {
    /// Values rendered as plain strings (ids, references)
    pub fn value_strings(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Keeps every trace for later inspection
#[derive(Debug, Default)]
pub struct CollectingTraceObserver {
    records: Mutex<Vec<TraceRecord>>,
}

impl CollectingTraceObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything collected so far
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Records carrying unreferenced contained ids
    pub fn unmatched(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.label == UNMATCHED_LABEL)
            .cloned()
            .collect()
    }

    /// Drain the collected records
    pub fn take(&self) -> Vec<TraceRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TraceObserver for CollectingTraceObserver {
    fn on_trace(&self, event: &TraceEvent<'_>) {
        self.records.lock().push(TraceRecord {
            index: event.site.index,
            key: event.site.key.to_string(),
            path: event.site.path.to_string(),
            label: event.label.to_string(),
            values: event.values.to_vec(),
        });
    }
}
