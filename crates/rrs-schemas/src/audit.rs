use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ReasonCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    JobCreated,
    JobQueued,
    JobStarted,
    JobPaused,
    JobCompleted,
    JobFailed,
    JobCancelled,
}

/// An immutable record of a job state transition. Append-only and monotone
/// in `created_at` per job; the first entry for any job is always
/// `job_created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub event_type: AuditEventType,
    pub job_id: String,
    pub reason_code: ReasonCode,
    pub created_at: DateTime<Utc>,
    pub details: Value,
}

/// The cross-service replay form: an `AuditEvent` enriched with the
/// identifying fields a downstream consumer needs without looking the job
/// up again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAuditEvent {
    pub event_id: String,
    pub event_type: AuditEventType,
    pub job_id: String,
    pub plan_id: String,
    pub plan_hash: String,
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
    pub reason_code: ReasonCode,
    pub created_at: DateTime<Utc>,
    pub details: Value,
}

impl AuditEvent {
    /// Total order used when listing a job's audit stream: (created_at,
    /// event_id) lexicographic.
    pub fn replay_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.event_id.as_str())
    }
}
