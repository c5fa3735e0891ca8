use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ReasonCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub plan_id: String,
    pub plan_hash: String,
    pub status: JobStatus,
    pub status_reason_code: ReasonCode,
    /// Non-null iff `status == Queued`.
    pub queue_position: Option<u64>,
    /// Tables currently blocking this job from running, when queued.
    pub wait_tables: Vec<String>,
    /// Non-null iff status has ever been `Running`.
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub lock_scope_tables: Vec<String>,
    pub required_capabilities: Vec<String>,
}

impl JobRecord {
    pub fn is_valid(&self) -> bool {
        let queue_position_ok = (self.status == JobStatus::Queued) == self.queue_position.is_some();
        let started_at_ok = self.started_at.is_some() || !self.has_ever_run();
        queue_position_ok && started_at_ok
    }

    fn has_ever_run(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Running | JobStatus::Paused | JobStatus::Completed | JobStatus::Failed
        )
    }
}
