//! Transition telemetry for job observability.
//!
//! Every persisted job mutation emits one [`TransitionRecord`] through a sink
//! abstraction. The store doesn't know how records are consumed — this
//! follows the "emit, don't present" pattern: consumers (logging, metrics,
//! dashboards) decide how to present or aggregate them.

use crate::job::{JobId, JobStatus, Stage};
use crate::retry::ErrorClass;
use crate::trace::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One structured record per job state transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Correlation id shared with the trigger event.
    pub correlation_id: CorrelationId,
    /// The job that transitioned.
    pub job_id: JobId,
    /// Status before the mutation.
    pub prev_status: JobStatus,
    /// Stage pointer before the mutation.
    pub prev_stage: Stage,
    /// Status after the mutation.
    pub new_status: JobStatus,
    /// Stage pointer after the mutation.
    pub new_stage: Stage,
    /// Time since the job started.
    pub elapsed: Duration,
    /// Error classification, when the transition recorded a failure.
    pub error_class: Option<ErrorClass>,
    /// When the transition happened.
    pub at: DateTime<Utc>,
}

/// Sink for transition records.
///
/// Implementations must be thread-safe; records are emitted from multiple
/// workers concurrently. `emit` should be fast and non-blocking.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, record: TransitionRecord);
}

/// Default sink that logs each transition as a structured tracing event.
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, record: TransitionRecord) {
        if record.new_status == JobStatus::Failed {
            tracing::warn!(
                correlation_id = %record.correlation_id,
                job_id = %record.job_id,
                prev_status = %record.prev_status,
                prev_stage = %record.prev_stage,
                new_status = %record.new_status,
                new_stage = %record.new_stage,
                elapsed_ms = record.elapsed.as_millis() as u64,
                error_class = record.error_class.map(|c| c.as_str()),
                "Job transition"
            );
        } else {
            tracing::info!(
                correlation_id = %record.correlation_id,
                job_id = %record.job_id,
                prev_status = %record.prev_status,
                prev_stage = %record.prev_stage,
                new_status = %record.new_status,
                new_stage = %record.new_stage,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "Job transition"
            );
        }
    }
}

/// Sink that drops every record. Useful in tests that assert on store state
/// rather than on telemetry.
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&self, _record: TransitionRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Collects records for assertions.
    pub struct CollectingSink(pub Mutex<Vec<TransitionRecord>>);

    impl TelemetrySink for CollectingSink {
        fn emit(&self, record: TransitionRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    fn record() -> TransitionRecord {
        TransitionRecord {
            correlation_id: CorrelationId::new(),
            job_id: JobId::new(),
            prev_status: JobStatus::Pending,
            prev_stage: Stage::Receive,
            new_status: JobStatus::Processing,
            new_stage: Stage::Receive,
            elapsed: Duration::from_millis(3),
            error_class: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_collecting_sink_receives_records() {
        let sink = CollectingSink(Mutex::new(Vec::new()));
        sink.emit(record());
        sink.emit(record());
        assert_eq!(sink.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_null_sink_accepts_records() {
        NullSink.emit(record());
    }

    #[test]
    fn test_record_serializes() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(json.contains("\"prev_status\":\"Pending\""));
    }
}
