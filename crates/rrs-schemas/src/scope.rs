use serde::{Deserialize, Serialize};

/// Immutable key on every request: (tenant_id, instance_id, source).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceScope {
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
}

impl SourceScope {
    pub fn new(
        tenant_id: impl Into<String>,
        instance_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            instance_id: instance_id.into(),
            source: source.into(),
        }
    }
}

/// Claims extracted from a verified bearer token (component H contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
}

impl AuthClaims {
    pub fn matches_scope(&self, scope: &SourceScope) -> bool {
        self.tenant_id == scope.tenant_id
            && self.instance_id == scope.instance_id
            && self.source == scope.source
    }
}
