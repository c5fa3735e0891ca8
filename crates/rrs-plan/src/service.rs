use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use rrs_db::SnapshotStore;
use rrs_index::WatermarkReader;
use rrs_registry::{validate_scope, ResolveOutcome, ResolveSourceMapping};
use rrs_schemas::{AuthClaims, GateDecision, GateRecord, PlanRecord, ReasonCode, SourceScope};

use crate::action_counts::compute_action_counts;
use crate::error::PlanError;
use crate::gate::evaluate_gate;
use crate::hash::{build_plan_hash_input, compute_plan_hash};
use crate::partitions::{partitions_from_rows, read_authoritative_watermarks};
use crate::pit::resolve_pit_candidates;
use crate::request::{DryRunPlanRequest, PlanOutcome};
use crate::store::PlanStoreState;

const SERVICE_SCOPE: &str = "rrs";

#[derive(Debug, Error)]
enum MutateError {
    #[error("plan hash mismatch for {0}")]
    HashMismatch(String),
}

pub struct PlanService {
    registry: Arc<dyn ResolveSourceMapping>,
    watermark_reader: Arc<dyn WatermarkReader>,
    store: Arc<dyn SnapshotStore<PlanStoreState>>,
}

impl PlanService {
    pub fn new(
        registry: Arc<dyn ResolveSourceMapping>,
        watermark_reader: Arc<dyn WatermarkReader>,
        store: Arc<dyn SnapshotStore<PlanStoreState>>,
    ) -> Self {
        Self {
            registry,
            watermark_reader,
            store,
        }
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<PlanRecord>, PlanError> {
        let state = self
            .store
            .read()
            .await
            .map_err(|e| PlanError::Internal(e.to_string()))?;
        Ok(state.plans.get(plan_id).cloned())
    }

    /// `createDryRunPlan`: structural validation, scope check, partition
    /// derivation, watermark read, PIT resolution, gate evaluation, and
    /// plan-hash computation, in that order.
    pub async fn create_dry_run_plan(
        &self,
        claims: &AuthClaims,
        req: DryRunPlanRequest,
    ) -> Result<PlanOutcome, PlanError> {
        // 1. Structural parse.
        self.validate_structure(&req)?;

        // 2. Scope validation (claims + ACP).
        self.validate_scope(claims, &req).await?;

        // 3-4. Partition derivation + authoritative watermark read. Step 4's
        // list-all/intersect-by-topic/hint-partition fallback chain only
        // runs when rows themselves carry no partitions, so this must be
        // the raw row-derived set, not `derive_requested_partitions`'s
        // hint-folded one.
        let row_partitions = partitions_from_rows(&req.rows);
        let watermarks = read_authoritative_watermarks(
            self.watermark_reader.as_ref(),
            &req.tenant_id,
            &req.instance_id,
            &req.source,
            &row_partitions,
            &req.watermarks,
        )
        .await?;

        // 5-6. Plan hash + action counts.
        let action_counts = compute_action_counts(&req.rows, &req.conflicts, &req.media_candidates);
        let plan_hash_input = build_plan_hash_input(
            req.pit.clone(),
            req.scope.clone(),
            req.execution_options.clone(),
            action_counts,
            &req.rows,
            &req.media_candidates,
        );
        let plan_hash = compute_plan_hash(&plan_hash_input)
            .map_err(|e| PlanError::Internal(e.to_string()))?;

        // 7. Ordered gate.
        let gate = evaluate_gate(
            &req.delete_candidates,
            &req.conflicts,
            &req.media_candidates,
            &watermarks,
        );

        // 8. PIT resolution.
        let pit_resolutions = resolve_pit_candidates(&req.pit_candidates);

        let mut lock_scope_tables = req.lock_scope_tables.clone();
        lock_scope_tables.sort();
        lock_scope_tables.dedup();

        let plan_id = req.plan_id.clone();
        let candidate_record = PlanRecord {
            plan_id: plan_id.clone(),
            plan_hash: plan_hash.clone(),
            lock_scope_tables,
            pit: req.pit.clone(),
            scope: req.scope.clone(),
            execution_options: req.execution_options.clone(),
            rows: req.rows.clone(),
            conflicts: req.conflicts.clone(),
            delete_candidates: req.delete_candidates.clone(),
            media_candidates: req.media_candidates.clone(),
            approval: req.approval.clone(),
            generated_at: Utc::now(),
            gate,
            pit_resolutions,
            watermarks,
        };

        // 9. Persist inside snapshot.mutate.
        let value = self
            .store
            .mutate(Box::new(move |mut state: PlanStoreState| {
                Box::pin(async move {
                    if let Some(existing) = state.plans.get(&plan_id) {
                        if existing.plan_hash == candidate_record.plan_hash {
                            let outcome = PlanOutcome {
                                record: existing.clone(),
                                status: 200,
                            };
                            let value = serde_json::to_value(&outcome)?;
                            return Ok((state, value));
                        }
                        return Err(anyhow::Error::new(MutateError::HashMismatch(plan_id)));
                    }
                    state.plans.insert(plan_id.clone(), candidate_record.clone());
                    let outcome = PlanOutcome {
                        record: candidate_record,
                        status: 201,
                    };
                    let value = serde_json::to_value(&outcome)?;
                    Ok((state, value))
                })
            }))
            .await;

        match value {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| PlanError::Internal(e.to_string())),
            Err(err) => match err.downcast_ref::<MutateError>() {
                Some(MutateError::HashMismatch(plan_id)) => Err(PlanError::PlanHashMismatch {
                    plan_id: plan_id.clone(),
                }),
                None => Err(PlanError::Internal(err.to_string())),
            },
        }
    }

    /// Used by the Job Service on `createJob`: if a `PlanRecord` already
    /// exists for `plan_id`, its `plan_hash` must match; otherwise this
    /// inserts a minimal placeholder (never gated, since no dry-run ever
    /// ran for it) so the job's `plan_id` still resolves to exactly one
    /// `PlanRecord` even when it was created without a prior dry-run.
    pub async fn ensure_placeholder_plan(
        &self,
        plan_id: &str,
        plan_hash: &str,
        scope: SourceScope,
        lock_scope_tables: Vec<String>,
    ) -> Result<(), PlanError> {
        let plan_id = plan_id.to_string();
        let plan_hash = plan_hash.to_string();

        let value = self
            .store
            .mutate(Box::new(move |mut state: PlanStoreState| {
                Box::pin(async move {
                    if let Some(existing) = state.plans.get(&plan_id) {
                        if existing.plan_hash != plan_hash {
                            return Err(anyhow::Error::new(MutateError::HashMismatch(plan_id)));
                        }
                        return Ok((state, serde_json::Value::Null));
                    }
                    let placeholder = PlanRecord {
                        plan_id: plan_id.clone(),
                        plan_hash: plan_hash.clone(),
                        lock_scope_tables,
                        pit: serde_json::Value::Null,
                        scope,
                        execution_options: serde_json::Value::Null,
                        rows: Vec::new(),
                        conflicts: Vec::new(),
                        delete_candidates: Vec::new(),
                        media_candidates: Vec::new(),
                        approval: None,
                        generated_at: Utc::now(),
                        gate: GateRecord {
                            decision: GateDecision::Blocked,
                            reason_code: ReasonCode::None,
                            unresolved_delete_candidates: 0,
                            unresolved_media_candidates: 0,
                            unresolved_reference_conflicts: 0,
                            stale_partitions: 0,
                            unknown_partitions: 0,
                        },
                        pit_resolutions: Vec::new(),
                        watermarks: Vec::new(),
                    };
                    state.plans.insert(plan_id.clone(), placeholder);
                    Ok((state, serde_json::Value::Null))
                })
            }))
            .await;

        match value {
            Ok(_) => Ok(()),
            Err(err) => match err.downcast_ref::<MutateError>() {
                Some(MutateError::HashMismatch(plan_id)) => Err(PlanError::PlanHashMismatch {
                    plan_id: plan_id.clone(),
                }),
                None => Err(PlanError::Internal(err.to_string())),
            },
        }
    }

    fn validate_structure(&self, req: &DryRunPlanRequest) -> Result<(), PlanError> {
        if req.tenant_id.trim().is_empty() {
            return Err(PlanError::InvalidRequest("tenant_id is required".to_string()));
        }
        if req.instance_id.trim().is_empty() {
            return Err(PlanError::InvalidRequest("instance_id is required".to_string()));
        }
        if req.source.trim().is_empty() {
            return Err(PlanError::InvalidRequest("source is required".to_string()));
        }
        if req.plan_id.trim().is_empty() {
            return Err(PlanError::InvalidRequest("plan_id is required".to_string()));
        }
        let requested = SourceScope::new(&req.tenant_id, &req.instance_id, &req.source);
        if req.scope != requested {
            return Err(PlanError::InvalidRequest(
                "scope must match tenant_id/instance_id/source".to_string(),
            ));
        }
        Ok(())
    }

    async fn validate_scope(&self, claims: &AuthClaims, req: &DryRunPlanRequest) -> Result<(), PlanError> {
        let requested = SourceScope::new(&req.tenant_id, &req.instance_id, &req.source);
        match self
            .registry
            .resolve(&req.tenant_id, &req.instance_id, SERVICE_SCOPE)
            .await
        {
            ResolveOutcome::Found(mapping) => {
                validate_scope(claims, &requested, &mapping, SERVICE_SCOPE)
                    .map_err(PlanError::ScopeBlocked)
            }
            ResolveOutcome::NotFound => Err(PlanError::ScopeBlocked(
                rrs_schemas::ReasonCode::BlockedUnknownSourceMapping,
            )),
            ResolveOutcome::Outage { message, .. } => Err(PlanError::ControlPlaneOutage(message)),
        }
    }
}
