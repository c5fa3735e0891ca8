use rrs_schemas::{PitCandidate, PitResolution, PitVersion};

/// Step 8: resolve each PIT candidate to its winning version using the
/// documented tie-breaker `(sys_updated_on, sys_mod_count, __time,
/// event_id)`, falling back to `(sys_updated_on, __time, event_id)` when
/// any version in the candidate's set lacks `sys_mod_count` — mixing
/// present and absent mod-counts within one comparison would be
/// meaningless, so the fallback applies to the whole candidate at once.
pub fn resolve_pit_candidates(candidates: &[PitCandidate]) -> Vec<PitResolution> {
    candidates
        .iter()
        .filter_map(resolve_one)
        .collect()
}

fn resolve_one(candidate: &PitCandidate) -> Option<PitResolution> {
    let use_mod_count = candidate
        .versions
        .iter()
        .all(|v| v.sys_mod_count.is_some());

    let winner: &PitVersion = candidate.versions.iter().max_by(|a, b| {
        if use_mod_count {
            (a.sys_updated_on, a.sys_mod_count, a.event_time, &a.event_id).cmp(&(
                b.sys_updated_on,
                b.sys_mod_count,
                b.event_time,
                &b.event_id,
            ))
        } else {
            (a.sys_updated_on, a.event_time, &a.event_id).cmp(&(
                b.sys_updated_on,
                b.event_time,
                &b.event_id,
            ))
        }
    })?;

    Some(PitResolution {
        row_id: candidate.row_id.clone(),
        table: candidate.table.clone(),
        record_sys_id: candidate.record_sys_id.clone(),
        winning_event_id: winner.event_id.clone(),
        winning_sys_updated_on: winner.sys_updated_on,
        winning_sys_mod_count: if use_mod_count { winner.sys_mod_count } else { None },
        winning_event_time: winner.event_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn version(event_id: &str, updated_on_offset_secs: i64, mod_count: Option<i64>) -> PitVersion {
        let base = Utc::now();
        PitVersion {
            event_id: event_id.to_string(),
            sys_updated_on: base + Duration::seconds(updated_on_offset_secs),
            sys_mod_count: mod_count,
            event_time: base + Duration::seconds(updated_on_offset_secs),
        }
    }

    #[test]
    fn picks_the_latest_sys_updated_on_when_mod_counts_present() {
        let candidate = PitCandidate {
            row_id: "r1".to_string(),
            table: "incident".to_string(),
            record_sys_id: "sys-1".to_string(),
            versions: vec![
                version("e1", 0, Some(1)),
                version("e2", 5, Some(2)),
                version("e3", 2, Some(3)),
            ],
        };
        let resolutions = resolve_pit_candidates(&[candidate]);
        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].winning_event_id, "e2");
        assert_eq!(resolutions[0].winning_sys_mod_count, Some(2));
    }

    #[test]
    fn falls_back_to_time_and_event_id_when_mod_count_missing() {
        let candidate = PitCandidate {
            row_id: "r1".to_string(),
            table: "incident".to_string(),
            record_sys_id: "sys-1".to_string(),
            versions: vec![version("e1", 0, None), version("e2", 5, Some(9))],
        };
        let resolutions = resolve_pit_candidates(&[candidate]);
        assert_eq!(resolutions[0].winning_event_id, "e2");
        assert_eq!(resolutions[0].winning_sys_mod_count, None);
    }

    #[test]
    fn ties_break_on_event_id_lexicographically() {
        let base = Utc::now();
        let candidate = PitCandidate {
            row_id: "r1".to_string(),
            table: "incident".to_string(),
            record_sys_id: "sys-1".to_string(),
            versions: vec![
                PitVersion {
                    event_id: "a".to_string(),
                    sys_updated_on: base,
                    sys_mod_count: Some(1),
                    event_time: base,
                },
                PitVersion {
                    event_id: "b".to_string(),
                    sys_updated_on: base,
                    sys_mod_count: Some(1),
                    event_time: base,
                },
            ],
        };
        let resolutions = resolve_pit_candidates(&[candidate]);
        assert_eq!(resolutions[0].winning_event_id, "b");
    }
}
