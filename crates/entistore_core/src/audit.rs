//! Audit export of successful writes.
//!
//! When an audit stream is configured, every insert or replace-by-predicate
//! is formatted as a [`WriteEnvelope`] and handed to an [`AuditSink`] on a
//! background thread. Publishing is best effort: a failing sink is logged
//! and never affects the write that produced the record.

use crate::entity::{Entity, CREATED_AT_FIELD, EXPIRES_AT_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

/// Errors raised by the audit path.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The envelope could not be serialized.
    #[error("failed to serialize audit record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink rejected the record.
    #[error("failed to publish to {stream}: {message}")]
    Publish {
        /// Target stream.
        stream: String,
        /// Description of the failure.
        message: String,
    },

    /// The background worker could not be started.
    #[error("failed to start audit worker: {0}")]
    Worker(#[from] std::io::Error),
}

impl AuditError {
    /// Creates a publish error.
    pub fn publish(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            stream: stream.into(),
            message: message.into(),
        }
    }
}

/// Destination of audit records (for example a delivery stream).
pub trait AuditSink: Send + Sync {
    /// Publishes one JSON record to a stream.
    ///
    /// # Errors
    ///
    /// Any error is logged by the caller and otherwise ignored.
    fn publish(&self, stream: &str, record: &str) -> Result<(), AuditError>;
}

/// A sink that writes records to the `tracing` log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn publish(&self, stream: &str, record: &str) -> Result<(), AuditError> {
        tracing::info!(stream, record, "audit record");
        Ok(())
    }
}

/// Kind of write being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// No previous document existed.
    Insert,
    /// One or more previous documents were replaced.
    Update,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Insert => f.write_str("Insert"),
            OperationType::Update => f.write_str("Update"),
        }
    }
}

/// The record forwarded to the audit sink.
///
/// Serialized as JSON with the keys `Service`, `OperationType`, `Entity`,
/// `EntityType` and `Date`. `Entity` is itself a JSON string holding the
/// entity without its `created_at` / `expires_at` bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteEnvelope {
    /// Name of the service that performed the write.
    pub service: String,
    /// Insert or update.
    pub operation_type: OperationType,
    /// JSON form of the entity.
    pub entity: String,
    /// Entity type name.
    pub entity_type: String,
    /// When the envelope was built.
    pub date: DateTime<Utc>,
}

impl WriteEnvelope {
    /// Builds an envelope for a write of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the entity cannot be converted to JSON.
    pub fn new<T: Entity>(
        service: &str,
        operation_type: OperationType,
        entity: &T,
    ) -> Result<Self, AuditError> {
        let mut json = serde_json::to_value(entity)?;
        if let Some(fields) = json.as_object_mut() {
            fields.remove(CREATED_AT_FIELD);
            fields.remove(EXPIRES_AT_FIELD);
        }
        Ok(Self {
            service: service.to_string(),
            operation_type,
            entity: serde_json::to_string(&json)?,
            entity_type: T::NAME.to_string(),
            date: Utc::now(),
        })
    }

    /// The JSON record handed to the sink.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string(self)?)
    }
}

enum Message {
    Record(String),
    Flush(Sender<()>),
}

/// Background publisher of write envelopes.
///
/// `emit` formats the envelope on the caller's thread and queues it; a
/// worker thread publishes queued records in order. Dropping the emitter
/// drains the queue before returning.
pub struct AuditEmitter {
    stream: String,
    service: String,
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl AuditEmitter {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns `Worker` if the thread cannot be spawned.
    pub fn start(
        stream: impl Into<String>,
        service: impl Into<String>,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, AuditError> {
        let stream = stream.into();
        let (sender, receiver) = mpsc::channel::<Message>();
        let worker_stream = stream.clone();

        let worker = std::thread::Builder::new()
            .name("entistore-audit".into())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Message::Record(record) => {
                            if let Err(err) = sink.publish(&worker_stream, &record) {
                                tracing::warn!(
                                    stream = %worker_stream,
                                    error = %err,
                                    "failed to publish audit record"
                                );
                            }
                        }
                        Message::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })?;

        Ok(Self {
            stream,
            service: service.into(),
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// The target stream.
    #[must_use]
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Queues an envelope for `entity`. Never blocks on the sink.
    pub fn emit<T: Entity>(&self, operation_type: OperationType, entity: &T) {
        let record = WriteEnvelope::new(&self.service, operation_type, entity)
            .and_then(|envelope| envelope.to_json());
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    entity_type = T::NAME,
                    error = %err,
                    "failed to format audit record"
                );
                return;
            }
        };

        let sent = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(Message::Record(record)).is_ok());
        if !sent {
            tracing::warn!(stream = %self.stream, "audit worker is not running; record dropped");
        }
    }

    /// Blocks until every record queued so far has been handed to the sink.
    pub fn flush(&self) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };
        let (ack, done) = mpsc::channel();
        if sender.send(Message::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl Drop for AuditEmitter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!(stream = %self.stream, "audit worker panicked");
            }
        }
    }
}

impl fmt::Debug for AuditEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditEmitter")
            .field("stream", &self.stream)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityHeader, Guid};
    use parking_lot::Mutex;

    #[derive(Debug, Serialize, Deserialize)]
    struct Note {
        #[serde(flatten)]
        header: EntityHeader<Guid>,
        text: String,
    }

    impl Entity for Note {
        const NAME: &'static str = "Note";
        type Id = Guid;

        fn header(&self) -> &EntityHeader<Guid> {
            &self.header
        }
    }

    fn note(text: &str) -> Note {
        Note {
            header: EntityHeader::new(),
            text: text.into(),
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<(String, String)>>);

    impl AuditSink for Collect {
        fn publish(&self, stream: &str, record: &str) -> Result<(), AuditError> {
            self.0.lock().push((stream.to_string(), record.to_string()));
            Ok(())
        }
    }

    struct Refuse;

    impl AuditSink for Refuse {
        fn publish(&self, stream: &str, _record: &str) -> Result<(), AuditError> {
            Err(AuditError::publish(stream, "throttled"))
        }
    }

    #[test]
    fn envelope_format() {
        let n = note("hello");
        let envelope = WriteEnvelope::new("notes-service", OperationType::Insert, &n).unwrap();
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(json["Service"], "notes-service");
        assert_eq!(json["OperationType"], "Insert");
        assert_eq!(json["EntityType"], "Note");
        assert!(json["Date"].as_str().unwrap().contains('T'));

        let entity: serde_json::Value =
            serde_json::from_str(json["Entity"].as_str().unwrap()).unwrap();
        assert_eq!(entity["text"], "hello");
        assert_eq!(entity["_id"], n.header.id().to_string());
        assert!(entity.get(CREATED_AT_FIELD).is_none());
        assert!(entity.get(EXPIRES_AT_FIELD).is_none());
    }

    #[test]
    fn emitter_publishes_in_order() {
        let sink = Arc::new(Collect::default());
        let emitter = AuditEmitter::start("audit", "svc", sink.clone()).unwrap();

        emitter.emit(OperationType::Insert, &note("one"));
        emitter.emit(OperationType::Update, &note("two"));
        emitter.flush();

        let records = sink.0.lock().clone();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|(stream, _)| stream == "audit"));
        assert!(records[0].1.contains("\"Insert\""));
        assert!(records[1].1.contains("\"Update\""));
    }

    #[test]
    fn failing_sink_is_tolerated() {
        let emitter = AuditEmitter::start("audit", "svc", Arc::new(Refuse)).unwrap();
        emitter.emit(OperationType::Insert, &note("lost"));
        emitter.flush();
        emitter.emit(OperationType::Insert, &note("also lost"));
        drop(emitter);
    }

    #[test]
    fn drop_drains_the_queue() {
        let sink = Arc::new(Collect::default());
        let emitter = AuditEmitter::start("audit", "svc", sink.clone()).unwrap();
        for i in 0..20 {
            emitter.emit(OperationType::Insert, &note(&i.to_string()));
        }
        drop(emitter);
        assert_eq!(sink.0.lock().len(), 20);
    }
}
