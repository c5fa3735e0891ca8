//! Restore-Index Reader: a read-only view of authoritative partition
//! freshness. Missing data is never silently treated as fresh — an
//! unrequested or unindexed partition comes back `unknown`, fail-closed.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rrs_schemas::Watermark;
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub topic: String,
    pub partition: i64,
}

/// Abstract contract consumed by the Plan Service gate.
#[async_trait]
pub trait WatermarkReader: Send + Sync {
    async fn read_watermarks_for_partitions(
        &self,
        tenant_id: &str,
        instance_id: &str,
        source: &str,
        partitions: &[PartitionKey],
        measured_at: DateTime<Utc>,
    ) -> Result<Vec<Watermark>>;

    async fn list_watermarks_for_source(
        &self,
        tenant_id: &str,
        instance_id: &str,
        source: &str,
    ) -> Result<Vec<Watermark>>;
}

/// Test/in-memory form: an upsertable map for test fixtures. Not backed by
/// any I/O.
#[derive(Debug, Default)]
pub struct InMemoryWatermarkReader {
    rows: Mutex<HashMap<(String, String, String, String, i64), Watermark>>,
}

impl InMemoryWatermarkReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, tenant_id: &str, instance_id: &str, source: &str, wm: Watermark) {
        let mut rows = self.rows.lock().expect("watermark map poisoned");
        rows.insert(
            (
                tenant_id.to_string(),
                instance_id.to_string(),
                source.to_string(),
                wm.topic.clone(),
                wm.partition,
            ),
            wm,
        );
    }
}

#[async_trait]
impl WatermarkReader for InMemoryWatermarkReader {
    async fn read_watermarks_for_partitions(
        &self,
        tenant_id: &str,
        instance_id: &str,
        source: &str,
        partitions: &[PartitionKey],
        _measured_at: DateTime<Utc>,
    ) -> Result<Vec<Watermark>> {
        let rows = self.rows.lock().expect("watermark map poisoned");
        let out = partitions
            .iter()
            .map(|p| {
                let key = (
                    tenant_id.to_string(),
                    instance_id.to_string(),
                    source.to_string(),
                    p.topic.clone(),
                    p.partition,
                );
                rows.get(&key)
                    .cloned()
                    .unwrap_or_else(|| Watermark::unknown(p.topic.clone(), p.partition))
            })
            .collect();
        Ok(out)
    }

    async fn list_watermarks_for_source(
        &self,
        tenant_id: &str,
        instance_id: &str,
        source: &str,
    ) -> Result<Vec<Watermark>> {
        let rows = self.rows.lock().expect("watermark map poisoned");
        Ok(rows
            .iter()
            .filter(|((t, i, s, _, _), _)| t == tenant_id && i == instance_id && s == source)
            .map(|(_, wm)| wm.clone())
            .collect())
    }
}

/// Production form: queries a persistent index via the shared pool.
pub struct PgWatermarkReader {
    pool: PgPool,
}

impl PgWatermarkReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkReader for PgWatermarkReader {
    async fn read_watermarks_for_partitions(
        &self,
        tenant_id: &str,
        instance_id: &str,
        source: &str,
        partitions: &[PartitionKey],
        _measured_at: DateTime<Utc>,
    ) -> Result<Vec<Watermark>> {
        let mut out = Vec::with_capacity(partitions.len());
        for p in partitions {
            let row: Option<(String, String, Option<DateTime<Utc>>, Option<DateTime<Utc>>)> = sqlx::query_as(
                r#"
                select freshness, executability, indexed_through_time, measured_at
                from restore_watermarks
                where tenant_id = $1 and instance_id = $2 and source = $3
                  and topic = $4 and partition = $5
                "#,
            )
            .bind(tenant_id)
            .bind(instance_id)
            .bind(source)
            .bind(&p.topic)
            .bind(p.partition)
            .fetch_optional(&self.pool)
            .await
            .context("read_watermarks_for_partitions query failed")?;

            out.push(match row {
                Some((freshness, executability, indexed_through_time, measured_at)) => {
                    watermark_from_row(p, &freshness, &executability, indexed_through_time, measured_at)
                }
                None => Watermark::unknown(p.topic.clone(), p.partition),
            });
        }
        Ok(out)
    }

    async fn list_watermarks_for_source(
        &self,
        tenant_id: &str,
        instance_id: &str,
        source: &str,
    ) -> Result<Vec<Watermark>> {
        let rows: Vec<(
            String,
            i64,
            String,
            String,
            Option<DateTime<Utc>>,
            Option<DateTime<Utc>>,
        )> = sqlx::query_as(
            r#"
            select topic, partition, freshness, executability, indexed_through_time, measured_at
            from restore_watermarks
            where tenant_id = $1 and instance_id = $2 and source = $3
            "#,
        )
        .bind(tenant_id)
        .bind(instance_id)
        .bind(source)
        .fetch_all(&self.pool)
        .await
        .context("list_watermarks_for_source query failed")?;

        Ok(rows
            .into_iter()
            .map(
                |(topic, partition, freshness, executability, indexed_through_time, measured_at)| {
                    let key = PartitionKey { topic, partition };
                    watermark_from_row(
                        &key,
                        &freshness,
                        &executability,
                        indexed_through_time,
                        measured_at,
                    )
                },
            )
            .collect())
    }
}

fn watermark_from_row(
    key: &PartitionKey,
    freshness: &str,
    executability: &str,
    indexed_through_time: Option<DateTime<Utc>>,
    measured_at: Option<DateTime<Utc>>,
) -> Watermark {
    use rrs_schemas::{Executability, Freshness, ReasonCode};

    let freshness = match freshness {
        "fresh" => Freshness::Fresh,
        "stale" => Freshness::Stale,
        _ => Freshness::Unknown,
    };
    let executability = match executability {
        "executable" => Executability::Executable,
        "preview_only" => Executability::PreviewOnly,
        _ => Executability::Blocked,
    };
    let reason_code = match freshness {
        Freshness::Fresh => ReasonCode::None,
        Freshness::Stale => ReasonCode::BlockedFreshnessStale,
        Freshness::Unknown => ReasonCode::BlockedFreshnessUnknown,
    };

    Watermark {
        topic: key.topic.clone(),
        partition: key.partition,
        freshness,
        executability,
        reason_code,
        indexed_through_time,
        measured_at,
    }
}
