//! Shared fixtures for scenario tests that exercise the daemon end to end:
//! a token minter so tests can build real `Authorization: Bearer ...`
//! headers, a pre-populated local registry, a pre-populated in-memory
//! watermark reader, and a one-call wiring of `PlanService`/`JobService`
//! over in-memory snapshot stores.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use rrs_auth::HmacJwtVerifier;
use rrs_db::InMemorySnapshotStore;
use rrs_index::InMemoryWatermarkReader;
use rrs_job::{JobService, JobStoreState};
use rrs_plan::{PlanService, PlanStoreState};
use rrs_registry::{ActivationState, LocalSourceRegistry, SourceMapping};
use rrs_schemas::{Executability, Freshness, ReasonCode, Watermark};

pub const TEST_JWT_SECRET: &[u8] = b"testkit-shared-secret";
pub const TEST_JWT_ISSUER: &str = "rezilient-acp";
pub const TEST_JWT_AUDIENCE: &str = "rezilient:rrs";
pub const TEST_JWT_SERVICE_SCOPE: &str = "rrs";

/// Mirrors `rrs_auth::Claims`'s wire shape so tests can mint tokens without
/// depending on that crate's private field layout staying identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TestClaims {
    iss: String,
    sub: String,
    aud: String,
    jti: String,
    iat: i64,
    exp: i64,
    service_scope: String,
    tenant_id: String,
    instance_id: String,
    source: String,
}

/// Mints a signed bearer token for `(tenant_id, instance_id, source)`,
/// valid for one hour from now, verifiable by [`test_verifier`].
pub fn mint_test_token(tenant_id: &str, instance_id: &str, source: &str) -> String {
    mint_test_token_expiring(tenant_id, instance_id, source, Duration::hours(1))
}

/// Same as [`mint_test_token`] but with an explicit time-to-expiry, so
/// tests can mint already-expired tokens.
pub fn mint_test_token_expiring(
    tenant_id: &str,
    instance_id: &str,
    source: &str,
    ttl: Duration,
) -> String {
    let now: DateTime<Utc> = Utc::now();
    let claims = TestClaims {
        iss: TEST_JWT_ISSUER.to_string(),
        sub: "testkit".to_string(),
        aud: TEST_JWT_AUDIENCE.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        service_scope: TEST_JWT_SERVICE_SCOPE.to_string(),
        tenant_id: tenant_id.to_string(),
        instance_id: instance_id.to_string(),
        source: source.to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("test token signing never fails")
}

/// Verifier wired to the same secret/issuer/audience [`mint_test_token`]
/// signs against.
pub fn test_verifier() -> HmacJwtVerifier {
    HmacJwtVerifier::new(
        TEST_JWT_SECRET,
        TEST_JWT_ISSUER,
        TEST_JWT_AUDIENCE,
        TEST_JWT_SERVICE_SCOPE,
        Duration::seconds(30),
    )
}

/// A `SourceMapping` fixture with every activation state `Active` and the
/// given services allowed.
pub fn active_mapping(
    tenant_id: &str,
    instance_id: &str,
    source: &str,
    allowed_services: &[&str],
) -> SourceMapping {
    SourceMapping {
        tenant_id: tenant_id.to_string(),
        instance_id: instance_id.to_string(),
        source: source.to_string(),
        allowed_services: allowed_services.iter().map(|s| s.to_string()).collect(),
        tenant_state: ActivationState::Active,
        entitlement_state: ActivationState::Active,
        instance_state: ActivationState::Active,
    }
}

/// A `LocalSourceRegistry` pre-populated with one active `(tenant, instance,
/// source)` mapping scoped to the `"rrs"` service.
pub fn registry_with_active_scope(
    tenant_id: &str,
    instance_id: &str,
    source: &str,
) -> LocalSourceRegistry {
    let mut registry = LocalSourceRegistry::new();
    registry.insert(active_mapping(tenant_id, instance_id, source, &["rrs"]));
    registry
}

/// A fresh, executable watermark for `(topic, partition)`, measured now.
pub fn fresh_watermark(topic: &str, partition: i64) -> Watermark {
    let now = Utc::now();
    Watermark {
        topic: topic.to_string(),
        partition,
        freshness: Freshness::Fresh,
        executability: Executability::Executable,
        reason_code: ReasonCode::None,
        indexed_through_time: Some(now),
        measured_at: Some(now),
    }
}

/// An `InMemoryWatermarkReader` pre-populated with one fresh, executable
/// watermark for `(topic, partition)`.
pub fn watermark_reader_with_fresh_partition(
    tenant_id: &str,
    instance_id: &str,
    source: &str,
    topic: &str,
    partition: i64,
) -> InMemoryWatermarkReader {
    let reader = InMemoryWatermarkReader::new();
    reader.upsert(tenant_id, instance_id, source, fresh_watermark(topic, partition));
    reader
}

/// `PlanService` and `JobService`, both backed by fresh in-memory snapshot
/// stores and sharing one registry, ready for scenario tests to drive
/// directly or to wrap in a daemon `AppState`.
pub struct TestServices {
    pub plan_service: Arc<PlanService>,
    pub job_service: Arc<JobService>,
}

pub fn build_test_services(
    registry: Arc<LocalSourceRegistry>,
    watermark_reader: Arc<InMemoryWatermarkReader>,
) -> TestServices {
    let plan_store = Arc::new(InMemorySnapshotStore::<PlanStoreState>::new());
    let plan_service = Arc::new(PlanService::new(
        registry.clone(),
        watermark_reader,
        plan_store,
    ));

    let job_store = Arc::new(InMemorySnapshotStore::<JobStoreState>::new());
    let job_service = Arc::new(JobService::new(registry, plan_service.clone(), job_store));

    TestServices {
        plan_service,
        job_service,
    }
}
