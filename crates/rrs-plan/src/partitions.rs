use std::collections::BTreeSet;

use chrono::Utc;
use rrs_index::{PartitionKey, WatermarkReader};
use rrs_schemas::{Row, Watermark, WatermarkHint};

use crate::error::PlanError;

/// Step 3: derive requested partitions from row metadata, falling back to
/// the caller's watermark hints when rows carry none.
pub fn derive_requested_partitions(rows: &[Row], hints: &[WatermarkHint]) -> Vec<PartitionKey> {
    let from_rows = partitions_from_rows(rows);
    if !from_rows.is_empty() {
        return from_rows;
    }
    hints
        .iter()
        .map(|h| PartitionKey {
            topic: h.topic.clone(),
            partition: h.partition,
        })
        .collect()
}

pub fn partitions_from_rows(rows: &[Row]) -> Vec<PartitionKey> {
    let mut set: BTreeSet<(String, i64)> = BTreeSet::new();
    for row in rows {
        let Some(topic) = row.topic.as_ref().map(|t| t.trim()) else {
            continue;
        };
        if topic.is_empty() {
            continue;
        }
        let Some(partition) = row.partition else {
            continue;
        };
        if partition < 0 {
            continue;
        }
        set.insert((topic.to_string(), partition));
    }
    set.into_iter()
        .map(|(topic, partition)| PartitionKey { topic, partition })
        .collect()
}

/// Step 4: read authoritative watermarks. If row-derived partitions exist,
/// read exactly those. Otherwise list all watermarks for the source and
/// intersect by the topic set extracted from rows (or, if that's also
/// empty, by the topics named in the watermark hints); if that intersection
/// yields nothing, fall back to per-partition reads over the hinted
/// partitions — which, for anything not actually indexed, come back
/// `unknown` (fail-closed), never fabricated as fresh.
pub async fn read_authoritative_watermarks(
    reader: &dyn WatermarkReader,
    tenant_id: &str,
    instance_id: &str,
    source: &str,
    row_partitions: &[PartitionKey],
    hints: &[WatermarkHint],
) -> Result<Vec<Watermark>, PlanError> {
    let measured_at = Utc::now();

    if !row_partitions.is_empty() {
        return reader
            .read_watermarks_for_partitions(tenant_id, instance_id, source, row_partitions, measured_at)
            .await
            .map_err(|e| PlanError::FreshnessUnknown(e.to_string()));
    }

    let all = reader
        .list_watermarks_for_source(tenant_id, instance_id, source)
        .await
        .map_err(|e| PlanError::FreshnessUnknown(e.to_string()))?;

    let hint_topics: BTreeSet<&str> = hints.iter().map(|h| h.topic.as_str()).collect();
    let intersected: Vec<Watermark> = all
        .into_iter()
        .filter(|wm| hint_topics.contains(wm.topic.as_str()))
        .collect();

    if !intersected.is_empty() {
        return Ok(intersected);
    }

    let hint_partitions: Vec<PartitionKey> = hints
        .iter()
        .map(|h| PartitionKey {
            topic: h.topic.clone(),
            partition: h.partition,
        })
        .collect();

    reader
        .read_watermarks_for_partitions(tenant_id, instance_id, source, &hint_partitions, measured_at)
        .await
        .map_err(|e| PlanError::FreshnessUnknown(e.to_string()))
}
