use serde::{Deserialize, Serialize};

use crate::ReasonCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningEntry {
    pub job_id: String,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEntry {
    pub job_id: String,
    pub tables: Vec<String>,
    pub tenant_id: String,
    pub instance_id: String,
    pub reason_code: ReasonCode,
    pub blocked_tables: Vec<String>,
}

/// Durable lock-manager state: two ordered sequences. FIFO on `queued_jobs`
/// by insertion order. Piggy-backs on the job snapshot rather than living in
/// its own table, so queue order is restored atomically with the jobs it
/// refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub running_jobs: Vec<RunningEntry>,
    pub queued_jobs: Vec<QueuedEntry>,
}
