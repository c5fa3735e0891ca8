use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Executability, ReasonCode, SourceScope, Watermark};

/// The gate's executability decision shares its wire vocabulary with
/// `Watermark::executability` (`executable` / `preview_only` / `blocked`).
pub type GateDecision = Executability;

/// A row in a dry-run plan. `row_id`, `table`, and `action` are the fields
/// the gate and plan-hash computation inspect directly; anything else the
/// caller sent rides along in `extra` so it still enters the plan-hash
/// canonicalization unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: String,
    pub table: String,
    pub action: RowAction,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub partition: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Update,
    Insert,
    Delete,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub update: u64,
    pub insert: u64,
    pub delete: u64,
    pub skip: u64,
    pub conflict: u64,
    pub attachment_apply: u64,
    pub attachment_skip: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_id: String,
    pub row_id: String,
    pub class: ConflictClass,
    #[serde(default)]
    pub resolved: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictClass {
    ReferenceConflict,
    SchemaConflict,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCandidate {
    pub row_id: String,
    /// `None` means the candidate is unresolved.
    #[serde(default)]
    pub decision: Option<DeleteDecision>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteDecision {
    Confirm,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub candidate_id: String,
    #[serde(default)]
    pub decision: Option<MediaDecision>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaDecision {
    Include,
    Exclude,
}

/// One version tuple considered during PIT resolution for a candidate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitVersion {
    pub event_id: String,
    pub sys_updated_on: DateTime<Utc>,
    #[serde(default)]
    pub sys_mod_count: Option<i64>,
    #[serde(rename = "__time")]
    pub event_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitCandidate {
    pub row_id: String,
    pub table: String,
    pub record_sys_id: String,
    pub versions: Vec<PitVersion>,
}

/// The winning version for one `PitCandidate`, per the documented
/// tie-breaker `(sys_updated_on, sys_mod_count, __time, event_id)` with a
/// `(sys_updated_on, __time, event_id)` fallback when `sys_mod_count` is
/// absent from every version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitResolution {
    pub row_id: String,
    pub table: String,
    pub record_sys_id: String,
    pub winning_event_id: String,
    pub winning_sys_updated_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_sys_mod_count: Option<i64>,
    pub winning_event_time: DateTime<Utc>,
}

/// The gate's full decision record, including the counts that justified it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
    pub decision: GateDecision,
    pub reason_code: ReasonCode,
    pub unresolved_delete_candidates: u64,
    pub unresolved_media_candidates: u64,
    pub unresolved_reference_conflicts: u64,
    pub stale_partitions: u64,
    pub unknown_partitions: u64,
}

/// Approval metadata attached to a dry-run request, opaque beyond
/// round-tripping into the plan-hash input and the stored record.
pub type Approval = Value;
pub type Pit = Value;
pub type ExecutionOptions = Value;

/// The exact, frozen structure hashed to produce `plan_hash`. Field order
/// here is irrelevant to the hash — canonicalization sorts keys after
/// serialization — but must match the wire contract's key set exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHashInput {
    pub contract_version: String,
    pub plan_hash_input_version: String,
    pub plan_hash_algorithm: String,
    pub pit: Pit,
    pub scope: SourceScope,
    pub execution_options: ExecutionOptions,
    pub action_counts: ActionCounts,
    pub rows: Vec<Row>,
    pub media_candidates: Vec<MediaCandidate>,
    pub metadata_allowlist_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub plan_id: String,
    pub plan_hash: String,
    pub lock_scope_tables: Vec<String>,
    pub pit: Pit,
    pub scope: SourceScope,
    pub execution_options: ExecutionOptions,
    pub rows: Vec<Row>,
    pub conflicts: Vec<Conflict>,
    pub delete_candidates: Vec<DeleteCandidate>,
    pub media_candidates: Vec<MediaCandidate>,
    #[serde(default)]
    pub approval: Option<Approval>,
    pub generated_at: DateTime<Utc>,
    pub gate: GateRecord,
    pub pit_resolutions: Vec<PitResolution>,
    pub watermarks: Vec<Watermark>,
}
