use rrs_schemas::{ActionCounts, Conflict, MediaCandidate, MediaDecision, Row, RowAction};

/// Step 6: scan rows for per-action counts, count unresolved-and-resolved
/// conflicts, and tally media-candidate decisions.
pub fn compute_action_counts(
    rows: &[Row],
    conflicts: &[Conflict],
    media_candidates: &[MediaCandidate],
) -> ActionCounts {
    let mut counts = ActionCounts::default();

    for row in rows {
        match row.action {
            RowAction::Update => counts.update += 1,
            RowAction::Insert => counts.insert += 1,
            RowAction::Delete => counts.delete += 1,
            RowAction::Skip => counts.skip += 1,
        }
    }

    counts.conflict = conflicts.len() as u64;

    for candidate in media_candidates {
        match candidate.decision {
            Some(MediaDecision::Include) => counts.attachment_apply += 1,
            Some(MediaDecision::Exclude) => counts.attachment_skip += 1,
            None => {}
        }
    }

    counts
}
