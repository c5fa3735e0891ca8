//! Daemon configuration: loads `.env.local` if present (dev convenience,
//! silent if missing — production injects env vars directly), then reads
//! every setting from the process environment into one typed `Config`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_service_scope: String,
    pub jwt_clock_skew: ChronoDuration,
    pub acp_base_url: String,
    pub acp_bearer_token: String,
    pub acp_timeout: Duration,
    pub registry_positive_ttl: Duration,
    pub registry_negative_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");

        Ok(Self {
            bind_addr: env_or("RRS_DAEMON_ADDR", "127.0.0.1:8080")?
                .parse()
                .context("RRS_DAEMON_ADDR is not a valid socket address")?,
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("RRS_JWT_SECRET")?,
            jwt_issuer: env_or("RRS_JWT_ISSUER", "rezilient-acp")?,
            jwt_audience: env_or("RRS_JWT_AUDIENCE", "rezilient:rrs")?,
            jwt_service_scope: env_or("RRS_JWT_SERVICE_SCOPE", "rrs")?,
            jwt_clock_skew: ChronoDuration::seconds(env_or("RRS_JWT_CLOCK_SKEW_SECS", "30")?.parse()?),
            acp_base_url: require_env("RRS_ACP_BASE_URL")?,
            acp_bearer_token: require_env("RRS_ACP_BEARER_TOKEN")?,
            acp_timeout: Duration::from_millis(env_or("RRS_ACP_TIMEOUT_MS", "2000")?.parse()?),
            registry_positive_ttl: Duration::from_secs(
                env_or("RRS_REGISTRY_POSITIVE_TTL_SECS", "30")?.parse()?,
            ),
            registry_negative_ttl: Duration::from_secs(
                env_or("RRS_REGISTRY_NEGATIVE_TTL_SECS", "5")?.parse()?,
            ),
        })
    }
}

fn env_or(key: &str, default: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) => Ok(v),
        Err(std::env::VarError::NotPresent) => Ok(default.to_string()),
        Err(err) => Err(err).with_context(|| format!("{key} is not valid unicode")),
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}
