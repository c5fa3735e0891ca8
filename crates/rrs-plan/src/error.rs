use rrs_schemas::ReasonCode;
use thiserror::Error;

/// Typed failure at the Plan Service's pure-logic seam, mirroring the
/// teacher's `TransitionError`/`GateRefusal` shape: a closed set of
/// failure modes callers match on, each carrying the wire status/reason
/// code it maps to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("scope blocked: {0}")]
    ScopeBlocked(ReasonCode),

    #[error("control plane outage: {0}")]
    ControlPlaneOutage(String),

    #[error("freshness unknown: {0}")]
    FreshnessUnknown(String),

    #[error("plan hash mismatch for plan_id {plan_id}")]
    PlanHashMismatch { plan_id: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl PlanError {
    pub fn status_code(&self) -> u16 {
        match self {
            PlanError::InvalidRequest(_) => 400,
            PlanError::ScopeBlocked(_) => 403,
            PlanError::ControlPlaneOutage(_) => 503,
            PlanError::FreshnessUnknown(_) => 503,
            PlanError::PlanHashMismatch { .. } => 409,
            PlanError::Internal(_) => 500,
        }
    }

    /// `None` for structural errors, which carry only the `error` label
    /// (`invalid_request`) and no entry from the closed reason-code
    /// vocabulary.
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            PlanError::InvalidRequest(_) => None,
            PlanError::ScopeBlocked(code) => Some(*code),
            PlanError::ControlPlaneOutage(_) => Some(ReasonCode::BlockedAuthControlPlaneOutage),
            PlanError::FreshnessUnknown(_) => Some(ReasonCode::BlockedFreshnessUnknown),
            PlanError::PlanHashMismatch { .. } => Some(ReasonCode::BlockedPlanHashMismatch),
            PlanError::Internal(_) => Some(ReasonCode::FailedInternalError),
        }
    }

    pub fn error_label(&self) -> &'static str {
        match self {
            PlanError::InvalidRequest(_) => "invalid_request",
            PlanError::ScopeBlocked(_) => "scope_blocked",
            PlanError::ControlPlaneOutage(_) => "service_unavailable",
            PlanError::FreshnessUnknown(_) => "service_unavailable",
            PlanError::PlanHashMismatch { .. } => "conflict",
            PlanError::Internal(_) => "internal_error",
        }
    }
}
