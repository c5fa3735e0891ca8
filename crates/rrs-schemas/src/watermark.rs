use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ReasonCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Stale,
    Unknown,
}

/// The gate's own executability decision; reused on `Watermark` since the
/// wire vocabulary for both is identical (`executable` / `preview_only` /
/// `blocked`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Executability {
    Executable,
    PreviewOnly,
    Blocked,
}

/// An authoritative (topic, partition) freshness descriptor. Read-only
/// input to the gate; never produced by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub topic: String,
    pub partition: i64,
    pub freshness: Freshness,
    pub executability: Executability,
    pub reason_code: ReasonCode,
    pub indexed_through_time: Option<DateTime<Utc>>,
    pub measured_at: Option<DateTime<Utc>>,
}

impl Watermark {
    /// A missing-partition placeholder: fail-closed, never fabricated as fresh.
    pub fn unknown(topic: impl Into<String>, partition: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            freshness: Freshness::Unknown,
            executability: Executability::Blocked,
            reason_code: ReasonCode::BlockedFreshnessUnknown,
            indexed_through_time: None,
            measured_at: None,
        }
    }
}

/// A caller-supplied (topic, partition) hint, used only as a fallback when
/// row metadata carries no derivable partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkHint {
    pub topic: String,
    pub partition: i64,
}
