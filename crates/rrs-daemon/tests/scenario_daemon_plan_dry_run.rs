//! In-process scenario tests for the `/v1/plans/dry-run` endpoint: plan-hash
//! idempotence on replay and rejection on a changed payload under the same
//! `plan_id`.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rrs_daemon::{routes, state::AppState};
use rrs_index::InMemoryWatermarkReader;
use rrs_testkit::{build_test_services, mint_test_token, registry_with_active_scope, test_verifier};
use tower::ServiceExt;

const TENANT: &str = "acme";
const INSTANCE: &str = "dev";
const SOURCE: &str = "crm";

fn make_router() -> axum::Router {
    let registry = Arc::new(registry_with_active_scope(TENANT, INSTANCE, SOURCE));
    let watermark_reader = Arc::new(InMemoryWatermarkReader::new());
    let services = build_test_services(registry, watermark_reader);
    let st = Arc::new(AppState::new(
        services.plan_service,
        services.job_service,
        Arc::new(test_verifier()),
    ));
    routes::build_router(st)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not valid JSON")
    };
    (status, json)
}

fn dry_run_req(plan_id: &str, requested_by: &str) -> Request<axum::body::Body> {
    let token = mint_test_token(TENANT, INSTANCE, SOURCE);
    let body = serde_json::json!({
        "tenant_id": TENANT,
        "instance_id": INSTANCE,
        "source": SOURCE,
        "plan_id": plan_id,
        "lock_scope_tables": ["incident"],
        "required_capabilities": [],
        "requested_by": requested_by,
        "pit": {},
        "scope": { "tenant_id": TENANT, "instance_id": INSTANCE, "source": SOURCE },
        "execution_options": {},
        "rows": [],
        "conflicts": [],
        "delete_candidates": [],
        "media_candidates": [],
        "watermarks": [],
        "pit_candidates": [],
    });

    Request::builder()
        .method("POST")
        .uri("/v1/plans/dry-run")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn first_dry_run_is_created_and_executable_with_no_rows() {
    let router = make_router();
    let req = dry_run_req("plan-1", "operator@example.com");

    let (status, json) = call(router, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["gate"]["decision"], "executable");
    assert!(json["plan_hash"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn replaying_the_same_plan_id_and_payload_is_idempotent() {
    let router = make_router();

    let first = dry_run_req("plan-1", "operator@example.com");
    let (status, first_json) = call(router.clone(), first).await;
    assert_eq!(status, StatusCode::CREATED);

    let replay = dry_run_req("plan-1", "operator@example.com");
    let (status, replay_json) = call(router, replay).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_json["plan_hash"], replay_json["plan_hash"]);
}

#[tokio::test]
async fn reusing_a_plan_id_with_a_changed_requester_still_hashes_identically() {
    // `requested_by` never enters the plan-hash input, so changing it alone
    // must still replay as the identical hash, not a conflict.
    let router = make_router();

    let first = dry_run_req("plan-1", "alice@example.com");
    let (status, first_json) = call(router.clone(), first).await;
    assert_eq!(status, StatusCode::CREATED);

    let second = dry_run_req("plan-1", "bob@example.com");
    let (status, second_json) = call(router, second).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first_json["plan_hash"], second_json["plan_hash"]);
}
