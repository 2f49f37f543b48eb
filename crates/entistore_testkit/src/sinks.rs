//! Audit sinks for tests.

use entistore_core::{AuditError, AuditSink, OperationType, WriteEnvelope};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One record received by a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct Published {
    /// Stream the record was published to.
    pub stream: String,
    /// The raw JSON record.
    pub record: String,
}

impl Published {
    /// Parses the record back into an envelope.
    ///
    /// # Panics
    ///
    /// Panics if the record is not a valid envelope.
    pub fn envelope(&self) -> WriteEnvelope {
        serde_json::from_str(&self.record).expect("audit record is not a write envelope")
    }
}

/// Keeps every published record in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Published>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn records(&self) -> Vec<Published> {
        self.records.lock().clone()
    }

    /// Parsed envelopes of everything published so far.
    pub fn envelopes(&self) -> Vec<WriteEnvelope> {
        self.records.lock().iter().map(Published::envelope).collect()
    }

    /// Number of envelopes with the given operation type.
    pub fn count(&self, operation: OperationType) -> usize {
        self.envelopes()
            .iter()
            .filter(|e| e.operation_type == operation)
            .count()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl AuditSink for RecordingSink {
    fn publish(&self, stream: &str, record: &str) -> Result<(), AuditError> {
        self.records.lock().push(Published {
            stream: stream.to_string(),
            record: record.to_string(),
        });
        Ok(())
    }
}

/// Rejects every record, counting the attempts.
#[derive(Debug, Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    /// Creates a sink that always fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish attempts.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl AuditSink for FailingSink {
    fn publish(&self, stream: &str, _record: &str) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::publish(stream, "sink unavailable"))
    }
}
