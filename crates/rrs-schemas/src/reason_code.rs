use serde::{Deserialize, Serialize};

/// The closed reason-code vocabulary. Every non-success response, and every
/// audit/gate record, carries exactly one of these. `#[serde(rename_all =
/// "snake_case")]` keeps the wire spelling identical to the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    None,
    QueuedScopeLock,
    BlockedUnknownSourceMapping,
    BlockedMissingCapability,
    BlockedUnresolvedDeleteCandidates,
    BlockedUnresolvedMediaCandidates,
    BlockedReferenceConflict,
    BlockedMediaParentMissing,
    BlockedFreshnessStale,
    BlockedFreshnessUnknown,
    BlockedAuthControlPlaneOutage,
    BlockedPlanHashMismatch,
    BlockedEvidenceNotReady,
    BlockedResumePreconditionMismatch,
    BlockedResumeCheckpointMissing,
    PausedTokenRefreshGraceExhausted,
    PausedEntitlementDisabled,
    PausedInstanceDisabled,
    FailedMediaParentMissing,
    FailedMediaHashMismatch,
    FailedMediaRetryExhausted,
    FailedEvidenceReportHashMismatch,
    FailedEvidenceArtifactHashMismatch,
    FailedEvidenceSignatureVerification,
    FailedSchemaConflict,
    FailedPermissionConflict,
    FailedInternalError,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::None => "none",
            ReasonCode::QueuedScopeLock => "queued_scope_lock",
            ReasonCode::BlockedUnknownSourceMapping => "blocked_unknown_source_mapping",
            ReasonCode::BlockedMissingCapability => "blocked_missing_capability",
            ReasonCode::BlockedUnresolvedDeleteCandidates => {
                "blocked_unresolved_delete_candidates"
            }
            ReasonCode::BlockedUnresolvedMediaCandidates => "blocked_unresolved_media_candidates",
            ReasonCode::BlockedReferenceConflict => "blocked_reference_conflict",
            ReasonCode::BlockedMediaParentMissing => "blocked_media_parent_missing",
            ReasonCode::BlockedFreshnessStale => "blocked_freshness_stale",
            ReasonCode::BlockedFreshnessUnknown => "blocked_freshness_unknown",
            ReasonCode::BlockedAuthControlPlaneOutage => "blocked_auth_control_plane_outage",
            ReasonCode::BlockedPlanHashMismatch => "blocked_plan_hash_mismatch",
            ReasonCode::BlockedEvidenceNotReady => "blocked_evidence_not_ready",
            ReasonCode::BlockedResumePreconditionMismatch => {
                "blocked_resume_precondition_mismatch"
            }
            ReasonCode::BlockedResumeCheckpointMissing => "blocked_resume_checkpoint_missing",
            ReasonCode::PausedTokenRefreshGraceExhausted => {
                "paused_token_refresh_grace_exhausted"
            }
            ReasonCode::PausedEntitlementDisabled => "paused_entitlement_disabled",
            ReasonCode::PausedInstanceDisabled => "paused_instance_disabled",
            ReasonCode::FailedMediaParentMissing => "failed_media_parent_missing",
            ReasonCode::FailedMediaHashMismatch => "failed_media_hash_mismatch",
            ReasonCode::FailedMediaRetryExhausted => "failed_media_retry_exhausted",
            ReasonCode::FailedEvidenceReportHashMismatch => {
                "failed_evidence_report_hash_mismatch"
            }
            ReasonCode::FailedEvidenceArtifactHashMismatch => {
                "failed_evidence_artifact_hash_mismatch"
            }
            ReasonCode::FailedEvidenceSignatureVerification => {
                "failed_evidence_signature_verification"
            }
            ReasonCode::FailedSchemaConflict => "failed_schema_conflict",
            ReasonCode::FailedPermissionConflict => "failed_permission_conflict",
            ReasonCode::FailedInternalError => "failed_internal_error",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        for code in [
            ReasonCode::None,
            ReasonCode::QueuedScopeLock,
            ReasonCode::BlockedFreshnessUnknown,
            ReasonCode::FailedInternalError,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            let back: ReasonCode = serde_json::from_str(&json).unwrap();
            assert_eq!(json.trim_matches('"'), code.as_str());
            assert_eq!(back.as_str(), code.as_str());
        }
    }
}
