//! Shared runtime state for rrs-daemon: handles to the Plan and Job
//! services plus the token verifier, all `Arc`-wrapped so handlers can
//! clone the state cheaply.

use std::sync::Arc;

use rrs_auth::TokenVerifier;
use rrs_job::JobService;
use rrs_plan::PlanService;

#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "rrs-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub plan_service: Arc<PlanService>,
    pub job_service: Arc<JobService>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(
        plan_service: Arc<PlanService>,
        job_service: Arc<JobService>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            plan_service,
            job_service,
            verifier,
            build: BuildInfo::default(),
        }
    }
}
