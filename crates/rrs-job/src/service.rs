use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use rrs_audit::{normalize, sort_for_replay};
use rrs_db::SnapshotStore;
use rrs_lock::TableLockManager;
use rrs_plan::PlanService;
use rrs_registry::{validate_scope, ResolveOutcome, ResolveSourceMapping};
use rrs_schemas::{
    AuditEvent, AuditEventType, AuthClaims, JobRecord, JobStatus, NormalizedAuditEvent,
    ReasonCode, SourceScope,
};

use crate::error::JobError;
use crate::request::{CompleteJobOutcome, CompleteJobRequest, CreateJobOutcome, CreateJobRequest};
use crate::store::JobStoreState;
use crate::transition::{self, JobEvent};

const SERVICE_SCOPE: &str = "rrs";

#[derive(Debug, Error)]
enum MutateError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job already terminal")]
    AlreadyTerminal,
    #[error("job not running")]
    NotRunning,
    #[error("job not paused")]
    NotPaused,
}

pub struct JobService {
    registry: Arc<dyn ResolveSourceMapping>,
    plan_service: Arc<PlanService>,
    store: Arc<dyn SnapshotStore<JobStoreState>>,
}

impl JobService {
    pub fn new(
        registry: Arc<dyn ResolveSourceMapping>,
        plan_service: Arc<PlanService>,
        store: Arc<dyn SnapshotStore<JobStoreState>>,
    ) -> Self {
        Self {
            registry,
            plan_service,
            store,
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, JobError> {
        let state = self
            .store
            .read()
            .await
            .map_err(|e| JobError::Internal(e.to_string()))?;
        Ok(state.jobs.get(job_id).cloned())
    }

    pub async fn list_audit(&self, job_id: &str) -> Result<Vec<NormalizedAuditEvent>, JobError> {
        let state = self
            .store
            .read()
            .await
            .map_err(|e| JobError::Internal(e.to_string()))?;
        let job = state
            .jobs
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        let scope = state
            .scopes
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        let mut events = state.audit.get(job_id).cloned().unwrap_or_default();
        sort_for_replay(&mut events);
        Ok(events.iter().map(|e| normalize(e, job, scope)).collect())
    }

    /// `createJob`: structural parse, scope validation, plan-hash
    /// reconciliation against a (possibly placeholder) `PlanRecord`, lock
    /// admission, and `job_created` + `job_queued`/`job_started` audit
    /// emission, all inside one `snapshot.mutate` over the job-and-lock
    /// store.
    pub async fn create_job(
        &self,
        claims: &AuthClaims,
        req: CreateJobRequest,
    ) -> Result<CreateJobOutcome, JobError> {
        self.validate_structure(&req)?;
        self.validate_scope(claims, &req).await?;

        let mut lock_scope_tables = req.lock_scope_tables.clone();
        lock_scope_tables.sort();
        lock_scope_tables.dedup();

        let scope = SourceScope::new(&req.tenant_id, &req.instance_id, &req.source);

        self.plan_service
            .ensure_placeholder_plan(
                &req.plan_id,
                &req.plan_hash,
                scope.clone(),
                lock_scope_tables.clone(),
            )
            .await?;

        let job_id = format!("job_{}", Uuid::new_v4());
        let now = Utc::now();
        let plan_id = req.plan_id.clone();
        let plan_hash = req.plan_hash.clone();
        let required_capabilities = req.required_capabilities.clone();
        let tenant_id = req.tenant_id.clone();
        let instance_id = req.instance_id.clone();
        let requested_by = req.requested_by.clone();

        let value = self
            .store
            .mutate(Box::new(move |mut state: JobStoreState| {
                Box::pin(async move {
                    let mut mgr = TableLockManager::from_state(state.lock.clone());
                    let outcome = mgr.acquire(
                        job_id.clone(),
                        tenant_id,
                        instance_id,
                        lock_scope_tables.clone(),
                    );
                    state.lock = mgr.export_state();

                    let (status, queue_position, wait_tables) = match outcome.grant {
                        rrs_lock::LockGrant::Running => (JobStatus::Running, None, Vec::new()),
                        rrs_lock::LockGrant::Queued => (
                            JobStatus::Queued,
                            outcome.queue_position,
                            outcome.blocked_tables.clone(),
                        ),
                    };

                    let job = JobRecord {
                        job_id: job_id.clone(),
                        plan_id,
                        plan_hash,
                        status,
                        status_reason_code: outcome.reason_code,
                        queue_position,
                        wait_tables,
                        started_at: if status == JobStatus::Running { Some(now) } else { None },
                        completed_at: None,
                        updated_at: now,
                        lock_scope_tables,
                        required_capabilities,
                    };

                    let mut events = vec![AuditEvent {
                        event_id: Uuid::new_v4().to_string(),
                        event_type: AuditEventType::JobCreated,
                        job_id: job_id.clone(),
                        reason_code: ReasonCode::None,
                        created_at: now,
                        details: serde_json::json!({ "requested_by": requested_by }),
                    }];
                    // one millisecond after `job_created` so the two events
                    // have a well-defined replay order even when the clock
                    // doesn't advance between them.
                    let followup_at = now + chrono::Duration::milliseconds(1);
                    events.push(match status {
                        JobStatus::Running => AuditEvent {
                            event_id: Uuid::new_v4().to_string(),
                            event_type: AuditEventType::JobStarted,
                            job_id: job_id.clone(),
                            reason_code: ReasonCode::None,
                            created_at: followup_at,
                            details: serde_json::json!({}),
                        },
                        _ => AuditEvent {
                            event_id: Uuid::new_v4().to_string(),
                            event_type: AuditEventType::JobQueued,
                            job_id: job_id.clone(),
                            reason_code: job.status_reason_code,
                            created_at: followup_at,
                            details: serde_json::json!({ "queue_position": job.queue_position }),
                        },
                    });

                    state.audit.entry(job_id.clone()).or_default().extend(events);
                    state.scopes.insert(job_id.clone(), scope.clone());
                    state.jobs.insert(job_id.clone(), job.clone());

                    let outcome = CreateJobOutcome { job, status: 201 };
                    let value = serde_json::to_value(&outcome)?;
                    Ok((state, value))
                })
            }))
            .await
            .map_err(|e| JobError::Internal(e.to_string()))?;

        serde_json::from_value(value).map_err(|e| JobError::Internal(e.to_string()))
    }

    /// `completeJob`.
    pub async fn complete_job(
        &self,
        job_id: &str,
        req: CompleteJobRequest,
    ) -> Result<CompleteJobOutcome, JobError> {
        let job_id = job_id.to_string();
        let target_status = req.status.as_job_status();
        let reason_code = req.reason_code.unwrap_or(ReasonCode::None);

        let value = self
            .store
            .mutate(Box::new(move |mut state: JobStoreState| {
                Box::pin(async move {
                    let Some(job) = state.jobs.get(&job_id).cloned() else {
                        return Err(anyhow::Error::new(MutateError::NotFound(job_id)));
                    };
                    if job.status.is_terminal() {
                        return Err(anyhow::Error::new(MutateError::AlreadyTerminal));
                    }

                    let mut mgr = TableLockManager::from_state(state.lock.clone());
                    let mut promoted_job_ids = Vec::new();
                    let now = Utc::now();

                    let new_status = match transition::apply(
                        job.status,
                        JobEvent::Complete(target_status),
                    ) {
                        Ok(s) => s,
                        Err(_) => {
                            // queued jobs never hold the lock; dequeue without
                            // promotion.
                            if job.status == JobStatus::Queued {
                                mgr.dequeue(&job_id);
                                target_status
                            } else {
                                return Err(anyhow::Error::new(MutateError::NotRunning));
                            }
                        }
                    };

                    if job.status != JobStatus::Queued {
                        let release = mgr.release(&job_id);
                        for promoted in release.promoted {
                            if let Some(p) = state.jobs.get_mut(&promoted.job_id) {
                                p.status = JobStatus::Running;
                                p.status_reason_code = ReasonCode::None;
                                p.queue_position = None;
                                p.wait_tables = Vec::new();
                                p.started_at = Some(now);
                                p.updated_at = now;
                            }
                            state
                                .audit
                                .entry(promoted.job_id.clone())
                                .or_default()
                                .push(AuditEvent {
                                    event_id: Uuid::new_v4().to_string(),
                                    event_type: AuditEventType::JobStarted,
                                    job_id: promoted.job_id.clone(),
                                    reason_code: promoted.reason_code,
                                    created_at: now,
                                    details: serde_json::json!({ "resumed_from_pause": false }),
                                });
                            promoted_job_ids.push(promoted.job_id);
                        }
                    }
                    state.lock = mgr.export_state();

                    let job_mut = state.jobs.get_mut(&job_id).expect("job present");
                    job_mut.status = new_status;
                    job_mut.status_reason_code = reason_code;
                    job_mut.queue_position = None;
                    job_mut.wait_tables = Vec::new();
                    job_mut.completed_at = Some(now);
                    job_mut.updated_at = now;
                    let job = job_mut.clone();

                    let event_type = match new_status {
                        JobStatus::Completed => AuditEventType::JobCompleted,
                        JobStatus::Failed => AuditEventType::JobFailed,
                        JobStatus::Cancelled => AuditEventType::JobCancelled,
                        _ => unreachable!("transition only yields terminal statuses"),
                    };
                    state.audit.entry(job_id.clone()).or_default().push(AuditEvent {
                        event_id: Uuid::new_v4().to_string(),
                        event_type,
                        job_id: job_id.clone(),
                        reason_code,
                        created_at: now,
                        details: serde_json::json!({}),
                    });

                    let outcome = CompleteJobOutcome { job, promoted_job_ids };
                    let value = serde_json::to_value(&outcome)?;
                    Ok((state, value))
                })
            }))
            .await;

        match value {
            Ok(value) => serde_json::from_value(value).map_err(|e| JobError::Internal(e.to_string())),
            Err(err) => Err(Self::map_mutate_error(err)),
        }
    }

    /// `pauseJob`: must be running.
    pub async fn pause_job(
        &self,
        job_id: &str,
        reason_code: ReasonCode,
    ) -> Result<JobRecord, JobError> {
        let job_id = job_id.to_string();
        let value = self
            .store
            .mutate(Box::new(move |mut state: JobStoreState| {
                Box::pin(async move {
                    let Some(job) = state.jobs.get(&job_id).cloned() else {
                        return Err(anyhow::Error::new(MutateError::NotFound(job_id)));
                    };
                    if job.status.is_terminal() {
                        return Err(anyhow::Error::new(MutateError::AlreadyTerminal));
                    }
                    transition::apply(job.status, JobEvent::Pause)
                        .map_err(|_| anyhow::Error::new(MutateError::NotRunning))?;

                    let now = Utc::now();
                    let job_mut = state.jobs.get_mut(&job_id).expect("job present");
                    job_mut.status = JobStatus::Paused;
                    job_mut.status_reason_code = reason_code;
                    job_mut.updated_at = now;
                    let job = job_mut.clone();

                    state.audit.entry(job_id.clone()).or_default().push(AuditEvent {
                        event_id: Uuid::new_v4().to_string(),
                        event_type: AuditEventType::JobPaused,
                        job_id: job_id.clone(),
                        reason_code,
                        created_at: now,
                        details: serde_json::json!({}),
                    });

                    let value = serde_json::to_value(&job)?;
                    Ok((state, value))
                })
            }))
            .await;

        match value {
            Ok(value) => serde_json::from_value(value).map_err(|e| JobError::Internal(e.to_string())),
            Err(err) => Err(Self::map_mutate_error(err)),
        }
    }

    /// `resumePausedJob`: must be paused.
    pub async fn resume_job(&self, job_id: &str) -> Result<JobRecord, JobError> {
        let job_id = job_id.to_string();
        let value = self
            .store
            .mutate(Box::new(move |mut state: JobStoreState| {
                Box::pin(async move {
                    let Some(job) = state.jobs.get(&job_id).cloned() else {
                        return Err(anyhow::Error::new(MutateError::NotFound(job_id)));
                    };
                    if job.status.is_terminal() {
                        return Err(anyhow::Error::new(MutateError::AlreadyTerminal));
                    }
                    transition::apply(job.status, JobEvent::Resume)
                        .map_err(|_| anyhow::Error::new(MutateError::NotPaused))?;

                    let now = Utc::now();
                    let job_mut = state.jobs.get_mut(&job_id).expect("job present");
                    job_mut.status = JobStatus::Running;
                    job_mut.status_reason_code = ReasonCode::None;
                    job_mut.updated_at = now;
                    let job = job_mut.clone();

                    state.audit.entry(job_id.clone()).or_default().push(AuditEvent {
                        event_id: Uuid::new_v4().to_string(),
                        event_type: AuditEventType::JobStarted,
                        job_id: job_id.clone(),
                        reason_code: ReasonCode::None,
                        created_at: now,
                        details: serde_json::json!({ "resumed_from_pause": true }),
                    });

                    let value = serde_json::to_value(&job)?;
                    Ok((state, value))
                })
            }))
            .await;

        match value {
            Ok(value) => serde_json::from_value(value).map_err(|e| JobError::Internal(e.to_string())),
            Err(err) => Err(Self::map_mutate_error(err)),
        }
    }

    fn map_mutate_error(err: anyhow::Error) -> JobError {
        match err.downcast_ref::<MutateError>() {
            Some(MutateError::NotFound(id)) => JobError::NotFound(id.clone()),
            Some(MutateError::AlreadyTerminal) => JobError::AlreadyTerminal,
            Some(MutateError::NotRunning) => JobError::NotRunning,
            Some(MutateError::NotPaused) => JobError::NotPaused,
            None => JobError::Internal(err.to_string()),
        }
    }

    fn validate_structure(&self, req: &CreateJobRequest) -> Result<(), JobError> {
        if req.tenant_id.trim().is_empty() {
            return Err(JobError::InvalidRequest("tenant_id is required".to_string()));
        }
        if req.instance_id.trim().is_empty() {
            return Err(JobError::InvalidRequest("instance_id is required".to_string()));
        }
        if req.source.trim().is_empty() {
            return Err(JobError::InvalidRequest("source is required".to_string()));
        }
        if req.plan_id.trim().is_empty() {
            return Err(JobError::InvalidRequest("plan_id is required".to_string()));
        }
        if req.plan_hash.trim().is_empty() {
            return Err(JobError::InvalidRequest("plan_hash is required".to_string()));
        }
        Ok(())
    }

    async fn validate_scope(&self, claims: &AuthClaims, req: &CreateJobRequest) -> Result<(), JobError> {
        let requested = SourceScope::new(&req.tenant_id, &req.instance_id, &req.source);
        match self
            .registry
            .resolve(&req.tenant_id, &req.instance_id, SERVICE_SCOPE)
            .await
        {
            ResolveOutcome::Found(mapping) => {
                validate_scope(claims, &requested, &mapping, SERVICE_SCOPE)
                    .map_err(JobError::ScopeBlocked)
            }
            ResolveOutcome::NotFound => Err(JobError::ScopeBlocked(
                ReasonCode::BlockedUnknownSourceMapping,
            )),
            ResolveOutcome::Outage { message, .. } => Err(JobError::ControlPlaneOutage(message)),
        }
    }
}
