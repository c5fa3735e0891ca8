//! Request and response types for rrs-daemon HTTP endpoints that aren't
//! already defined as domain types in `rrs-job`/`rrs-plan`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

/// Uniform error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub reason_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PauseJobRequest {
    #[serde(default)]
    pub reason_code: Option<rrs_schemas::ReasonCode>,
}
