//! Axum router and all HTTP handlers for rrs-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests
//! in `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use rrs_auth::AuthError;
use rrs_job::{CompleteJobRequest, CreateJobRequest, JobError};
use rrs_plan::{DryRunPlanRequest, PlanError};
use rrs_schemas::{AuthClaims, ReasonCode};

use crate::api_types::{ErrorResponse, HealthResponse, PauseJobRequest};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/plans/dry-run", post(create_dry_run_plan))
        .route("/v1/jobs", post(create_job))
        .route("/v1/jobs/:job_id", get(get_job))
        .route("/v1/jobs/:job_id/audit", get(get_job_audit))
        .route("/v1/jobs/:job_id/complete", post(complete_job))
        .route("/v1/jobs/:job_id/pause", post(pause_job))
        .route("/v1/jobs/:job_id/resume", post(resume_job))
        .with_state(state)
}

async fn authenticate(st: &AppState, headers: &HeaderMap) -> Result<AuthClaims, AuthError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::TokenMalformed)?;

    st.verifier.verify(token).await.map(|c| c.to_auth_claims())
}

impl IntoResponse for AuthErrorBody {
    fn into_response(self) -> Response {
        (
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
            Json(ErrorResponse {
                error: "unauthorized".to_string(),
                reason_code: Some(self.0.reason_code().to_string()),
            }),
        )
            .into_response()
    }
}

struct AuthErrorBody(AuthError);

fn plan_error_response(err: PlanError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.error_label().to_string(),
            reason_code: err.reason_code().map(|r| r.as_str().to_string()),
        }),
    )
        .into_response()
}

fn job_error_response(err: JobError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.error_label().to_string(),
            reason_code: err.reason_code().map(|r| r.as_str().to_string()),
        }),
    )
        .into_response()
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

pub(crate) async fn create_dry_run_plan(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<DryRunPlanRequest>,
) -> Response {
    let claims = match authenticate(&st, &headers).await {
        Ok(c) => c,
        Err(err) => return AuthErrorBody(err).into_response(),
    };

    match st.plan_service.create_dry_run_plan(&claims, body).await {
        Ok(outcome) => (
            StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::CREATED),
            Json(outcome.record),
        )
            .into_response(),
        Err(err) => plan_error_response(err),
    }
}

pub(crate) async fn create_job(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateJobRequest>,
) -> Response {
    let claims = match authenticate(&st, &headers).await {
        Ok(c) => c,
        Err(err) => return AuthErrorBody(err).into_response(),
    };

    match st.job_service.create_job(&claims, body).await {
        Ok(outcome) => (
            StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::CREATED),
            Json(outcome),
        )
            .into_response(),
        Err(err) => job_error_response(err),
    }
}

pub(crate) async fn get_job(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    if let Err(err) = authenticate(&st, &headers).await {
        return AuthErrorBody(err).into_response();
    }

    match st.job_service.get_job(&job_id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => job_error_response(JobError::NotFound(job_id)),
        Err(err) => job_error_response(err),
    }
}

pub(crate) async fn get_job_audit(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    if let Err(err) = authenticate(&st, &headers).await {
        return AuthErrorBody(err).into_response();
    }

    match st.job_service.list_audit(&job_id).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(err) => job_error_response(err),
    }
}

pub(crate) async fn complete_job(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(body): Json<CompleteJobRequest>,
) -> Response {
    if let Err(err) = authenticate(&st, &headers).await {
        return AuthErrorBody(err).into_response();
    }

    match st.job_service.complete_job(&job_id, body).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => job_error_response(err),
    }
}

pub(crate) async fn pause_job(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    body: Option<Json<PauseJobRequest>>,
) -> Response {
    if let Err(err) = authenticate(&st, &headers).await {
        return AuthErrorBody(err).into_response();
    }

    let reason_code = body
        .and_then(|Json(b)| b.reason_code)
        .unwrap_or(ReasonCode::PausedTokenRefreshGraceExhausted);

    match st.job_service.pause_job(&job_id, reason_code).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => job_error_response(err),
    }
}

pub(crate) async fn resume_job(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    if let Err(err) = authenticate(&st, &headers).await {
        return AuthErrorBody(err).into_response();
    }

    match st.job_service.resume_job(&job_id).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => job_error_response(err),
    }
}
