//! Source Registry / ACP Resolver: validates (tenant, instance, source)
//! triples against an external authorization control plane, with an
//! interchangeable local implementation for tests and a positive/negative
//! TTL cache wrapper in front of either.
//!
//! One validated entry point, swappable backend behind a trait — callers
//! never reach around it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rrs_schemas::{AuthClaims, ReasonCode, SourceScope};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
    pub allowed_services: Vec<String>,
    pub tenant_state: ActivationState,
    pub entitlement_state: ActivationState,
    pub instance_state: ActivationState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    Active,
    Disabled,
    Suspended,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Found(SourceMapping),
    NotFound,
    Outage { message: String, status: Option<u16> },
}

#[async_trait]
pub trait ResolveSourceMapping: Send + Sync {
    async fn resolve(
        &self,
        tenant_id: &str,
        instance_id: &str,
        service_scope: &str,
    ) -> ResolveOutcome;
}

/// Static map from (tenant_id, instance_id) to a source mapping, for tests
/// and fully self-hosted deployments with no external ACP.
#[derive(Debug, Default)]
pub struct LocalSourceRegistry {
    map: BTreeMap<(String, String), SourceMapping>,
}

impl LocalSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mapping: SourceMapping) {
        self.map.insert(
            (mapping.tenant_id.clone(), mapping.instance_id.clone()),
            mapping,
        );
    }
}

#[async_trait]
impl ResolveSourceMapping for LocalSourceRegistry {
    async fn resolve(
        &self,
        tenant_id: &str,
        instance_id: &str,
        _service_scope: &str,
    ) -> ResolveOutcome {
        match self
            .map
            .get(&(tenant_id.to_string(), instance_id.to_string()))
        {
            Some(mapping) => ResolveOutcome::Found(mapping.clone()),
            None => ResolveOutcome::NotFound,
        }
    }
}

/// POSTs to the external ACP with an internal bearer token. Timeouts and
/// non-2xx/non-404 responses map to `Outage`; 404 maps to `NotFound`.
pub struct AcpSourceRegistry {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
    timeout: Duration,
}

impl AcpSourceRegistry {
    pub fn new(client: reqwest::Client, base_url: String, bearer_token: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            bearer_token,
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct AcpResolveRequest<'a> {
    tenant_id: &'a str,
    instance_id: &'a str,
    service_scope: &'a str,
}

#[async_trait]
impl ResolveSourceMapping for AcpSourceRegistry {
    async fn resolve(
        &self,
        tenant_id: &str,
        instance_id: &str,
        service_scope: &str,
    ) -> ResolveOutcome {
        let request = self
            .client
            .post(format!("{}/v1/source-mappings:resolve", self.base_url))
            .bearer_auth(&self.bearer_token)
            .json(&AcpResolveRequest {
                tenant_id,
                instance_id,
                service_scope,
            })
            .send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                return ResolveOutcome::Outage {
                    message: format!("ACP request failed: {err}"),
                    status: None,
                }
            }
            Err(_) => {
                return ResolveOutcome::Outage {
                    message: "ACP timeout".to_string(),
                    status: None,
                }
            }
        };

        let status = response.status();
        if status.as_u16() == 404 {
            return ResolveOutcome::NotFound;
        }
        if !status.is_success() {
            return ResolveOutcome::Outage {
                message: format!("ACP returned {status}"),
                status: Some(status.as_u16()),
            };
        }

        match response.json::<SourceMapping>().await {
            Ok(mapping) => ResolveOutcome::Found(mapping),
            Err(err) => ResolveOutcome::Outage {
                message: format!("ACP response body invalid: {err}"),
                status: Some(status.as_u16()),
            },
        }
    }
}

#[derive(Debug, Clone)]
enum CachedOutcome {
    Found(SourceMapping),
    NotFound,
}

struct CacheEntry {
    outcome: CachedOutcome,
    expires_at: Instant,
}

/// Memoizes positive results for `positive_ttl` and `not_found` for
/// `negative_ttl`. Never caches `Outage` — an outage must always be
/// re-attempted on the next call.
pub struct CachedSourceRegistry<R: ResolveSourceMapping> {
    inner: R,
    positive_ttl: Duration,
    negative_ttl: Duration,
    cache: Mutex<HashMap<(String, String, String), CacheEntry>>,
}

impl<R: ResolveSourceMapping> CachedSourceRegistry<R> {
    pub fn new(inner: R, positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            inner,
            positive_ttl,
            negative_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<R: ResolveSourceMapping> ResolveSourceMapping for CachedSourceRegistry<R> {
    async fn resolve(
        &self,
        tenant_id: &str,
        instance_id: &str,
        service_scope: &str,
    ) -> ResolveOutcome {
        let key = (
            tenant_id.to_string(),
            instance_id.to_string(),
            service_scope.to_string(),
        );

        if let Some(entry) = self.cache.lock().expect("registry cache poisoned").get(&key) {
            if entry.expires_at > Instant::now() {
                return match &entry.outcome {
                    CachedOutcome::Found(m) => ResolveOutcome::Found(m.clone()),
                    CachedOutcome::NotFound => ResolveOutcome::NotFound,
                };
            }
        }

        let outcome = self.inner.resolve(tenant_id, instance_id, service_scope).await;
        match &outcome {
            ResolveOutcome::Found(mapping) => {
                self.cache.lock().expect("registry cache poisoned").insert(
                    key,
                    CacheEntry {
                        outcome: CachedOutcome::Found(mapping.clone()),
                        expires_at: Instant::now() + self.positive_ttl,
                    },
                );
            }
            ResolveOutcome::NotFound => {
                self.cache.lock().expect("registry cache poisoned").insert(
                    key,
                    CacheEntry {
                        outcome: CachedOutcome::NotFound,
                        expires_at: Instant::now() + self.negative_ttl,
                    },
                );
            }
            ResolveOutcome::Outage { .. } => {}
        }
        outcome
    }
}

/// Scope validation shared by the Plan and Job services: claims triple must
/// equal the request triple, the mapping triple must equal the request
/// triple, `service_scope` must be in `allowed_services`, and all three
/// activation states must be `active`.
pub fn validate_scope(
    claims: &AuthClaims,
    requested: &SourceScope,
    mapping: &SourceMapping,
    service_scope: &str,
) -> Result<(), ReasonCode> {
    if !claims.matches_scope(requested) {
        return Err(ReasonCode::BlockedUnknownSourceMapping);
    }
    let mapping_matches = mapping.tenant_id == requested.tenant_id
        && mapping.instance_id == requested.instance_id
        && mapping.source == requested.source;
    if !mapping_matches {
        return Err(ReasonCode::BlockedUnknownSourceMapping);
    }
    if !mapping
        .allowed_services
        .iter()
        .any(|s| s == service_scope)
    {
        return Err(ReasonCode::BlockedUnknownSourceMapping);
    }
    let all_active = mapping.tenant_state == ActivationState::Active
        && mapping.entitlement_state == ActivationState::Active
        && mapping.instance_state == ActivationState::Active;
    if !all_active {
        return Err(ReasonCode::BlockedUnknownSourceMapping);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_mapping() -> SourceMapping {
        SourceMapping {
            tenant_id: "acme".to_string(),
            instance_id: "dev".to_string(),
            source: "sn://acme-dev".to_string(),
            allowed_services: vec!["rrs".to_string()],
            tenant_state: ActivationState::Active,
            entitlement_state: ActivationState::Active,
            instance_state: ActivationState::Active,
        }
    }

    #[tokio::test]
    async fn local_registry_found_and_not_found() {
        let mut registry = LocalSourceRegistry::new();
        registry.insert(active_mapping());
        match registry.resolve("acme", "dev", "rrs").await {
            ResolveOutcome::Found(m) => assert_eq!(m.source, "sn://acme-dev"),
            other => panic!("expected Found, got {other:?}"),
        }
        assert_eq!(
            registry.resolve("other", "dev", "rrs").await,
            ResolveOutcome::NotFound
        );
    }

    #[test]
    fn validate_scope_rejects_claims_mismatch() {
        let claims = AuthClaims {
            tenant_id: "other".to_string(),
            instance_id: "dev".to_string(),
            source: "sn://acme-dev".to_string(),
        };
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let mapping = active_mapping();
        assert_eq!(
            validate_scope(&claims, &scope, &mapping, "rrs"),
            Err(ReasonCode::BlockedUnknownSourceMapping)
        );
    }

    #[test]
    fn validate_scope_rejects_inactive_entitlement() {
        let claims = AuthClaims {
            tenant_id: "acme".to_string(),
            instance_id: "dev".to_string(),
            source: "sn://acme-dev".to_string(),
        };
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let mut mapping = active_mapping();
        mapping.entitlement_state = ActivationState::Disabled;
        assert_eq!(
            validate_scope(&claims, &scope, &mapping, "rrs"),
            Err(ReasonCode::BlockedUnknownSourceMapping)
        );
    }

    #[test]
    fn validate_scope_accepts_matching_active_triple() {
        let claims = AuthClaims {
            tenant_id: "acme".to_string(),
            instance_id: "dev".to_string(),
            source: "sn://acme-dev".to_string(),
        };
        let scope = SourceScope::new("acme", "dev", "sn://acme-dev");
        let mapping = active_mapping();
        assert_eq!(validate_scope(&claims, &scope, &mapping, "rrs"), Ok(()));
    }

    struct CountingOutageRegistry {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ResolveSourceMapping for CountingOutageRegistry {
        async fn resolve(&self, _: &str, _: &str, _: &str) -> ResolveOutcome {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            ResolveOutcome::Outage {
                message: "ACP timeout".to_string(),
                status: None,
            }
        }
    }

    #[tokio::test]
    async fn cache_never_memoizes_outage() {
        let inner = CountingOutageRegistry {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let cached = CachedSourceRegistry::new(
            inner,
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        cached.resolve("acme", "dev", "rrs").await;
        cached.resolve("acme", "dev", "rrs").await;
        assert_eq!(
            cached.inner.calls.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    #[tokio::test]
    async fn cache_memoizes_found_within_ttl() {
        struct CountingFoundRegistry {
            calls: std::sync::atomic::AtomicUsize,
        }
        #[async_trait]
        impl ResolveSourceMapping for CountingFoundRegistry {
            async fn resolve(&self, _: &str, _: &str, _: &str) -> ResolveOutcome {
                self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                ResolveOutcome::Found(active_mapping())
            }
        }
        let inner = CountingFoundRegistry {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let cached = CachedSourceRegistry::new(
            inner,
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        cached.resolve("acme", "dev", "rrs").await;
        cached.resolve("acme", "dev", "rrs").await;
        assert_eq!(
            cached.inner.calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }
}
