use serde::{Deserialize, Serialize};

use rrs_schemas::{Approval, JobRecord, JobStatus, ReasonCode};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobRequest {
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
    pub plan_id: String,
    pub plan_hash: String,
    #[serde(default)]
    pub lock_scope_tables: Vec<String>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    pub requested_by: String,
    #[serde(default)]
    pub approval: Option<Approval>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobOutcome {
    pub job: JobRecord,
    /// 201, always — admission (running or queued) is itself the success
    /// case; only parse/scope/hash failures produce a non-201 response.
    pub status: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteJobRequest {
    pub status: TerminalStatus,
    #[serde(default)]
    pub reason_code: Option<ReasonCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Completed,
    Failed,
    Cancelled,
}

impl TerminalStatus {
    pub fn as_job_status(&self) -> JobStatus {
        match self {
            TerminalStatus::Completed => JobStatus::Completed,
            TerminalStatus::Failed => JobStatus::Failed,
            TerminalStatus::Cancelled => JobStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteJobOutcome {
    pub job: JobRecord,
    pub promoted_job_ids: Vec<String>,
}
