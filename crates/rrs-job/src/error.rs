use rrs_plan::PlanError;
use rrs_schemas::ReasonCode;
use thiserror::Error;

/// Typed failure at the Job Service's pure-logic seam, the same closed-enum
/// shape as `rrs_plan::PlanError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("scope blocked: {0}")]
    ScopeBlocked(ReasonCode),

    #[error("control plane outage: {0}")]
    ControlPlaneOutage(String),

    #[error("plan hash mismatch for plan_id {plan_id}")]
    PlanHashMismatch { plan_id: String },

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job already in a terminal state")]
    AlreadyTerminal,

    #[error("job is not running")]
    NotRunning,

    #[error("job is not paused")]
    NotPaused,

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn status_code(&self) -> u16 {
        match self {
            JobError::InvalidRequest(_) => 400,
            JobError::ScopeBlocked(_) => 403,
            JobError::ControlPlaneOutage(_) => 503,
            JobError::PlanHashMismatch { .. } => 409,
            JobError::NotFound(_) => 404,
            JobError::AlreadyTerminal => 409,
            JobError::NotRunning => 409,
            JobError::NotPaused => 409,
            JobError::Internal(_) => 500,
        }
    }

    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            JobError::InvalidRequest(_) => None,
            JobError::ScopeBlocked(code) => Some(*code),
            JobError::ControlPlaneOutage(_) => Some(ReasonCode::BlockedAuthControlPlaneOutage),
            JobError::PlanHashMismatch { .. } => Some(ReasonCode::BlockedPlanHashMismatch),
            JobError::NotFound(_) => None,
            JobError::AlreadyTerminal => None,
            JobError::NotRunning => None,
            JobError::NotPaused => None,
            JobError::Internal(_) => Some(ReasonCode::FailedInternalError),
        }
    }

    pub fn error_label(&self) -> &'static str {
        match self {
            JobError::InvalidRequest(_) => "invalid_request",
            JobError::ScopeBlocked(_) => "scope_blocked",
            JobError::ControlPlaneOutage(_) => "service_unavailable",
            JobError::PlanHashMismatch { .. } => "conflict",
            JobError::NotFound(_) => "not_found",
            JobError::AlreadyTerminal => "already_terminal",
            JobError::NotRunning => "job_not_running",
            JobError::NotPaused => "job_not_paused",
            JobError::Internal(_) => "internal_error",
        }
    }
}

impl From<PlanError> for JobError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::InvalidRequest(m) => JobError::InvalidRequest(m),
            PlanError::ScopeBlocked(code) => JobError::ScopeBlocked(code),
            PlanError::ControlPlaneOutage(m) => JobError::ControlPlaneOutage(m),
            PlanError::FreshnessUnknown(m) => JobError::Internal(m),
            PlanError::PlanHashMismatch { plan_id } => JobError::PlanHashMismatch { plan_id },
            PlanError::Internal(m) => JobError::Internal(m),
        }
    }
}
