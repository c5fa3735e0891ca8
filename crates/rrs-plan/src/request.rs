use serde::{Deserialize, Serialize};

use rrs_schemas::{
    Approval, Conflict, DeleteCandidate, ExecutionOptions, MediaCandidate, Pit, PitCandidate, Row,
    SourceScope, WatermarkHint,
};

#[derive(Debug, Clone, Deserialize)]
pub struct DryRunPlanRequest {
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
    pub plan_id: String,
    #[serde(default)]
    pub lock_scope_tables: Vec<String>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    pub requested_by: String,
    #[serde(default)]
    pub approval: Option<Approval>,
    pub pit: Pit,
    pub scope: SourceScope,
    pub execution_options: ExecutionOptions,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub delete_candidates: Vec<DeleteCandidate>,
    #[serde(default)]
    pub media_candidates: Vec<MediaCandidate>,
    #[serde(default)]
    pub watermarks: Vec<WatermarkHint>,
    #[serde(default)]
    pub pit_candidates: Vec<PitCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub record: rrs_schemas::PlanRecord,
    /// 200 (idempotent replay) or 201 (newly created).
    pub status: u16,
}
