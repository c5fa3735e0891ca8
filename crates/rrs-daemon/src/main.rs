//! rrs-daemon entry point.
//!
//! This file is intentionally thin: it loads config, wires the shared
//! state, attaches middleware, and starts the HTTP server. All route
//! handlers live in `routes.rs`; all shared state types live in
//! `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use rrs_auth::HmacJwtVerifier;
use rrs_config::Config;
use rrs_daemon::{routes, state};
use rrs_db::PgSnapshotStore;
use rrs_index::PgWatermarkReader;
use rrs_job::{JobService, JobStoreState};
use rrs_plan::{PlanService, PlanStoreState};
use rrs_registry::{AcpSourceRegistry, CachedSourceRegistry};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    init_tracing();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    rrs_db::migrate(&pool).await.context("running migrations")?;

    let registry = Arc::new(CachedSourceRegistry::new(
        AcpSourceRegistry::new(
            reqwest::Client::new(),
            config.acp_base_url.clone(),
            config.acp_bearer_token.clone(),
            config.acp_timeout,
        ),
        config.registry_positive_ttl,
        config.registry_negative_ttl,
    ));

    let watermark_reader = Arc::new(PgWatermarkReader::new(pool.clone()));
    let plan_store = Arc::new(PgSnapshotStore::<PlanStoreState>::new(
        pool.clone(),
        "rrs_plan_state_snapshots",
    ));
    let plan_service = Arc::new(PlanService::new(
        registry.clone(),
        watermark_reader,
        plan_store,
    ));

    let job_store = Arc::new(PgSnapshotStore::<JobStoreState>::new(
        pool.clone(),
        "rrs_job_state_snapshots",
    ));
    let job_service = Arc::new(JobService::new(
        registry,
        plan_service.clone(),
        job_store,
    ));

    let verifier = Arc::new(HmacJwtVerifier::new(
        config.jwt_secret.as_bytes(),
        config.jwt_issuer.clone(),
        config.jwt_audience.clone(),
        config.jwt_service_scope.clone(),
        config.jwt_clock_skew,
    ));

    let shared = Arc::new(state::AppState::new(plan_service, job_service, verifier));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!("rrs-daemon listening on http://{}", config.bind_addr);

    axum::serve(tokio::net::TcpListener::bind(config.bind_addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins, same defaults as the rest of the
/// pack's dev tooling.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
