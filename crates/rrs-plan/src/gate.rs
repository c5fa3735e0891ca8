use rrs_schemas::{
    Conflict, ConflictClass, DeleteCandidate, Executability, Freshness, GateDecision, GateRecord,
    MediaCandidate, ReasonCode, Watermark,
};

/// The ordered gate. Evaluated top-to-bottom, first match wins, the same
/// shape as an ordered-verdict checklist: once a blocking condition fires,
/// no later check can override it.
pub fn evaluate_gate(
    delete_candidates: &[DeleteCandidate],
    conflicts: &[Conflict],
    media_candidates: &[MediaCandidate],
    watermarks: &[Watermark],
) -> GateRecord {
    let unresolved_delete_candidates =
        delete_candidates.iter().filter(|d| d.decision.is_none()).count() as u64;
    let unresolved_reference_conflicts = conflicts
        .iter()
        .filter(|c| c.class == ConflictClass::ReferenceConflict && !c.resolved)
        .count() as u64;
    let unresolved_media_candidates =
        media_candidates.iter().filter(|m| m.decision.is_none()).count() as u64;
    let unknown_partitions = watermarks
        .iter()
        .filter(|w| w.freshness == Freshness::Unknown || w.reason_code == ReasonCode::BlockedFreshnessUnknown)
        .count() as u64;
    let stale_partitions = watermarks
        .iter()
        .filter(|w| {
            w.freshness == Freshness::Stale
                || w.executability != Executability::Executable
                || w.reason_code == ReasonCode::BlockedFreshnessStale
        })
        .count() as u64;

    let (decision, reason_code) = if unresolved_delete_candidates > 0 {
        (GateDecision::Blocked, ReasonCode::BlockedUnresolvedDeleteCandidates)
    } else if unresolved_reference_conflicts > 0 {
        (GateDecision::Blocked, ReasonCode::BlockedReferenceConflict)
    } else if unresolved_media_candidates > 0 {
        (GateDecision::Blocked, ReasonCode::BlockedUnresolvedMediaCandidates)
    } else if unknown_partitions > 0 {
        (GateDecision::Blocked, ReasonCode::BlockedFreshnessUnknown)
    } else if stale_partitions > 0 {
        (GateDecision::PreviewOnly, ReasonCode::BlockedFreshnessStale)
    } else {
        (GateDecision::Executable, ReasonCode::None)
    };

    GateRecord {
        decision,
        reason_code,
        unresolved_delete_candidates,
        unresolved_media_candidates,
        unresolved_reference_conflicts,
        stale_partitions,
        unknown_partitions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;

    fn fresh_watermark() -> Watermark {
        Watermark {
            topic: "rez.cdc".to_string(),
            partition: 7,
            freshness: Freshness::Fresh,
            executability: Executability::Executable,
            reason_code: ReasonCode::None,
            indexed_through_time: Some(Utc::now()),
            measured_at: Some(Utc::now()),
        }
    }

    #[test]
    fn all_clear_is_executable() {
        let gate = evaluate_gate(&[], &[], &[], &[fresh_watermark()]);
        assert_eq!(gate.decision, GateDecision::Executable);
        assert_eq!(gate.reason_code, ReasonCode::None);
    }

    #[test]
    fn unresolved_delete_candidate_takes_precedence_over_unknown_watermark() {
        let delete_candidates = vec![DeleteCandidate {
            row_id: "r1".to_string(),
            decision: None,
            extra: Map::new(),
        }];
        let watermarks = vec![Watermark::unknown("rez.cdc", 7)];
        let gate = evaluate_gate(&delete_candidates, &[], &[], &watermarks);
        assert_eq!(gate.decision, GateDecision::Blocked);
        assert_eq!(gate.reason_code, ReasonCode::BlockedUnresolvedDeleteCandidates);
    }

    #[test]
    fn unknown_watermark_blocks_before_stale_is_considered() {
        let mut stale = fresh_watermark();
        stale.freshness = Freshness::Stale;
        stale.executability = Executability::PreviewOnly;
        stale.reason_code = ReasonCode::BlockedFreshnessStale;

        let watermarks = vec![Watermark::unknown("rez.cdc", 1), stale];
        let gate = evaluate_gate(&[], &[], &[], &watermarks);
        assert_eq!(gate.decision, GateDecision::Blocked);
        assert_eq!(gate.reason_code, ReasonCode::BlockedFreshnessUnknown);
    }

    #[test]
    fn stale_without_unknown_is_preview_only() {
        let mut stale = fresh_watermark();
        stale.freshness = Freshness::Stale;
        stale.executability = Executability::PreviewOnly;
        stale.reason_code = ReasonCode::BlockedFreshnessStale;

        let gate = evaluate_gate(&[], &[], &[], &[stale]);
        assert_eq!(gate.decision, GateDecision::PreviewOnly);
        assert_eq!(gate.reason_code, ReasonCode::BlockedFreshnessStale);
    }

    #[test]
    fn unresolved_reference_conflict_blocks_but_ranks_below_delete_candidates() {
        let conflicts = vec![Conflict {
            conflict_id: "c1".to_string(),
            row_id: "r1".to_string(),
            class: ConflictClass::ReferenceConflict,
            resolved: false,
            extra: Map::new(),
        }];
        let gate = evaluate_gate(&[], &conflicts, &[], &[fresh_watermark()]);
        assert_eq!(gate.decision, GateDecision::Blocked);
        assert_eq!(gate.reason_code, ReasonCode::BlockedReferenceConflict);
    }
}
