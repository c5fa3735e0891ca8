use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rrs_schemas::{AuditEvent, JobRecord, LockState, SourceScope};

/// The durable state the Job Service's snapshot store persists: every known
/// job, the lock manager's queue state (piggy-backed here so a job's status
/// and its lock queue position can never drift apart across a restart),
/// each job's append-only audit stream, and the scope each job was created
/// under (needed to normalize its audit events without a second lookup).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStoreState {
    pub jobs: BTreeMap<String, JobRecord>,
    pub lock: LockState,
    pub audit: BTreeMap<String, Vec<AuditEvent>>,
    pub scopes: BTreeMap<String, SourceScope>,
}
