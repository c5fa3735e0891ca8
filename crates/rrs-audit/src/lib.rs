//! Audit Normalizer: maps internal job lifecycle events into the
//! cross-service replay-ordered form, and provides the canonical-JSON
//! hashing primitives the Plan Service reuses for `plan_hash`.
//!
//! Uses the same recursive key-sorting canonicalization as the other
//! crates in this workspace, plus an optional, off-by-default
//! tamper-evident hash-chain (`hash_prev`/`hash_self`,
//! `verify_hash_chain`) for deployments that want one.

use anyhow::{Context, Result};
use rrs_schemas::{AuditEvent, JobRecord, NormalizedAuditEvent, SourceScope};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Maps {instance_id, plan_hash, plan_id, source, tenant_id} plus the raw
/// event into the replay-ordered cross-service form.
pub fn normalize(event: &AuditEvent, job: &JobRecord, scope: &SourceScope) -> NormalizedAuditEvent {
    NormalizedAuditEvent {
        event_id: event.event_id.clone(),
        event_type: event.event_type,
        job_id: event.job_id.clone(),
        plan_id: job.plan_id.clone(),
        plan_hash: job.plan_hash.clone(),
        tenant_id: scope.tenant_id.clone(),
        instance_id: scope.instance_id.clone(),
        source: scope.source.clone(),
        reason_code: event.reason_code,
        created_at: event.created_at,
        details: event.details.clone(),
    }
}

/// Sorts a job's audit stream by the documented replay comparator:
/// (created_at, event_id) lexicographic. Stable, so ties preserve
/// insertion order.
pub fn sort_for_replay(events: &mut [AuditEvent]) {
    events.sort_by(|a, b| a.replay_key().cmp(&b.replay_key()));
}

/// Canonicalize JSON by recursively sorting object keys and emitting
/// compact JSON, so structurally identical input always hashes the same.
pub fn canonical_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("canonical json serialization failed")
}

pub fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

pub fn sha256_hex(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// One event plus its optional chain linkage.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainedEvent {
    pub event: AuditEvent,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Tamper-evident hash-chain state over a job's event sequence. Disabled
/// by default; enabling it costs one extra hash per append and lets
/// `verify_hash_chain` detect any reordering or tampering after the fact.
#[derive(Debug, Clone, Default)]
pub struct HashChainState {
    enabled: bool,
    last_hash: Option<String>,
}

impl HashChainState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_hash: None,
        }
    }

    pub fn set_last_hash(&mut self, hash: Option<String>) {
        self.last_hash = hash;
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn append(&mut self, event: AuditEvent) -> Result<ChainedEvent> {
        if !self.enabled {
            return Ok(ChainedEvent {
                event,
                hash_prev: None,
                hash_self: None,
            });
        }
        let hash_prev = self.last_hash.clone();
        let hash_self = compute_event_hash(&event, hash_prev.as_deref())?;
        self.last_hash = Some(hash_self.clone());
        Ok(ChainedEvent {
            event,
            hash_prev,
            hash_self: Some(hash_self),
        })
    }
}

fn compute_event_hash(event: &AuditEvent, hash_prev: Option<&str>) -> Result<String> {
    let mut value = serde_json::to_value(event).context("audit event serialization failed")?;
    if let Value::Object(ref mut map) = value {
        map.insert(
            "hash_prev".to_string(),
            hash_prev.map(Value::from).unwrap_or(Value::Null),
        );
    }
    let canonical = canonical_json(&value)?;
    Ok(sha256_hex(&canonical))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { events: usize },
    Broken { index: usize, reason: String },
}

/// Re-derives each event's hash in order and checks the chain linkage.
pub fn verify_hash_chain(events: &[ChainedEvent]) -> Result<VerifyResult> {
    let mut last_hash: Option<String> = None;
    for (idx, chained) in events.iter().enumerate() {
        if chained.hash_prev != last_hash {
            return Ok(VerifyResult::Broken {
                index: idx,
                reason: "hash_prev does not match previous event's hash_self".to_string(),
            });
        }
        let expected = compute_event_hash(&chained.event, chained.hash_prev.as_deref())?;
        if chained.hash_self.as_deref() != Some(expected.as_str()) {
            return Ok(VerifyResult::Broken {
                index: idx,
                reason: "hash_self does not match recomputed hash".to_string(),
            });
        }
        last_hash = chained.hash_self.clone();
    }
    Ok(VerifyResult::Valid {
        events: events.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rrs_schemas::{AuditEventType, JobStatus, ReasonCode};

    fn sample_event(event_id: &str, created_at: chrono::DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            event_id: event_id.to_string(),
            event_type: AuditEventType::JobCreated,
            job_id: "job_abc".to_string(),
            reason_code: ReasonCode::None,
            created_at,
            details: Value::Null,
        }
    }

    #[test]
    fn sort_keys_is_recursive_and_stable() {
        let v = serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}});
        let s = canonical_json(&v).unwrap();
        assert_eq!(s, r#"{"a":{"c":3,"d":2},"b":1}"#);
    }

    #[test]
    fn sort_for_replay_orders_by_created_at_then_event_id() {
        let now = Utc::now();
        let mut events = vec![
            sample_event("b", now),
            sample_event("a", now),
            sample_event("z", now - Duration::seconds(1)),
        ];
        sort_for_replay(&mut events);
        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }

    #[test]
    fn disabled_chain_never_hashes() {
        let mut chain = HashChainState::new(false);
        let chained = chain.append(sample_event("a", Utc::now())).unwrap();
        assert_eq!(chained.hash_prev, None);
        assert_eq!(chained.hash_self, None);
    }

    #[test]
    fn enabled_chain_links_and_verifies() {
        let mut chain = HashChainState::new(true);
        let e1 = chain.append(sample_event("a", Utc::now())).unwrap();
        let e2 = chain.append(sample_event("b", Utc::now())).unwrap();
        assert_eq!(e1.hash_prev, None);
        assert_eq!(e2.hash_prev, e1.hash_self);

        let result = verify_hash_chain(&[e1, e2]).unwrap();
        assert_eq!(result, VerifyResult::Valid { events: 2 });
    }

    #[test]
    fn tampered_event_breaks_the_chain() {
        let mut chain = HashChainState::new(true);
        let e1 = chain.append(sample_event("a", Utc::now())).unwrap();
        let mut e2 = chain.append(sample_event("b", Utc::now())).unwrap();
        e2.event.reason_code = ReasonCode::FailedInternalError;

        let result = verify_hash_chain(&[e1, e2]).unwrap();
        match result {
            VerifyResult::Broken { index, .. } => assert_eq!(index, 1),
            other => panic!("expected Broken, got {other:?}"),
        }
    }

    #[test]
    fn normalize_carries_scope_and_plan_identity() {
        let job = JobRecord {
            job_id: "job_abc".to_string(),
            plan_id: "plan-01".to_string(),
            plan_hash: "c".repeat(64),
            status: JobStatus::Running,
            status_reason_code: ReasonCode::None,
            queue_position: None,
            wait_tables: vec![],
            started_at: Some(Utc::now()),
            completed_at: None,
            updated_at: Utc::now(),
            lock_scope_tables: vec!["incident".to_string()],
            required_capabilities: vec![],
        };
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let event = sample_event("a", Utc::now());

        let normalized = normalize(&event, &job, &scope);
        assert_eq!(normalized.plan_id, "plan-01");
        assert_eq!(normalized.tenant_id, "acme");
        assert_eq!(normalized.source, "sn://acme-dev");
    }
}
