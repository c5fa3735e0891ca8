use anyhow::{Context, Result};
use rrs_schemas::{ActionCounts, ExecutionOptions, MediaCandidate, Pit, Row, SourceScope};

pub const CONTRACT_VERSION: &str = "1.0";
pub const PLAN_HASH_INPUT_VERSION: &str = "1";
pub const PLAN_HASH_ALGORITHM: &str = "sha256";
pub const METADATA_ALLOWLIST_VERSION: &str = "1";

/// Builds the frozen `PlanHashInput`, canonicalizing rows sorted by
/// `row_id` and media candidates sorted by `candidate_id`, exactly as the
/// contract requires.
pub fn build_plan_hash_input(
    pit: Pit,
    scope: SourceScope,
    execution_options: ExecutionOptions,
    action_counts: ActionCounts,
    rows: &[Row],
    media_candidates: &[MediaCandidate],
) -> rrs_schemas::PlanHashInput {
    let mut sorted_rows = rows.to_vec();
    sorted_rows.sort_by(|a, b| a.row_id.cmp(&b.row_id));

    let mut sorted_media = media_candidates.to_vec();
    sorted_media.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));

    rrs_schemas::PlanHashInput {
        contract_version: CONTRACT_VERSION.to_string(),
        plan_hash_input_version: PLAN_HASH_INPUT_VERSION.to_string(),
        plan_hash_algorithm: PLAN_HASH_ALGORITHM.to_string(),
        pit,
        scope,
        execution_options,
        action_counts,
        rows: sorted_rows,
        media_candidates: sorted_media,
        metadata_allowlist_version: METADATA_ALLOWLIST_VERSION.to_string(),
    }
}

/// SHA-256 over the canonical-JSON serialization of the plan-hash input:
/// keys in lexicographic order, no insignificant whitespace, lowercase hex
/// digest.
pub fn compute_plan_hash(input: &rrs_schemas::PlanHashInput) -> Result<String> {
    let value = serde_json::to_value(input).context("plan hash input serialization failed")?;
    let canonical = rrs_audit::canonical_json(&value)?;
    Ok(rrs_audit::sha256_hex(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrs_schemas::RowAction;
    use serde_json::{json, Map};

    fn row(id: &str, action: RowAction) -> Row {
        Row {
            row_id: id.to_string(),
            table: "incident".to_string(),
            action,
            topic: None,
            partition: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn identical_inputs_hash_identically_regardless_of_row_order() {
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let rows_a = vec![row("b", RowAction::Update), row("a", RowAction::Insert)];
        let rows_b = vec![row("a", RowAction::Insert), row("b", RowAction::Update)];

        let input_a = build_plan_hash_input(
            json!({}),
            scope.clone(),
            json!({}),
            ActionCounts::default(),
            &rows_a,
            &[],
        );
        let input_b = build_plan_hash_input(json!({}), scope, json!({}), ActionCounts::default(), &rows_b, &[]);

        assert_eq!(
            compute_plan_hash(&input_a).unwrap(),
            compute_plan_hash(&input_b).unwrap()
        );
    }

    #[test]
    fn changing_a_row_action_changes_the_hash() {
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let rows_a = vec![row("a", RowAction::Update)];
        let rows_b = vec![row("a", RowAction::Delete)];

        let input_a = build_plan_hash_input(
            json!({}),
            scope.clone(),
            json!({}),
            ActionCounts::default(),
            &rows_a,
            &[],
        );
        let input_b = build_plan_hash_input(json!({}), scope, json!({}), ActionCounts::default(), &rows_b, &[]);

        assert_ne!(
            compute_plan_hash(&input_a).unwrap(),
            compute_plan_hash(&input_b).unwrap()
        );
    }

    #[test]
    fn hash_is_64_lowercase_hex_chars() {
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let input = build_plan_hash_input(json!({}), scope, json!({}), ActionCounts::default(), &[], &[]);
        let hash = compute_plan_hash(&input).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
