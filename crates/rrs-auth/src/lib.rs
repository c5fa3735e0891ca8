//! Auth Boundary: verifies the compact HS256 bearer token every request
//! carries and extracts the `(tenant_id, instance_id, source)` claims the
//! Plan and Job services validate requests against.

use async_trait::async_trait;
use chrono::Duration;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rrs_schemas::AuthClaims;

const EXPECTED_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub service_scope: String,
    pub tenant_id: String,
    pub instance_id: String,
    pub source: String,
}

impl Claims {
    pub fn to_auth_claims(&self) -> AuthClaims {
        AuthClaims {
            tenant_id: self.tenant_id.clone(),
            instance_id: self.instance_id.clone(),
            source: self.source.clone(),
        }
    }
}

/// The closed set of auth-failure reason codes. Distinct from
/// `rrs_schemas::ReasonCode`, which covers plan/job gating — auth fails
/// before any of that logic ever runs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    TokenMalformed,
    #[error("token signature is invalid")]
    TokenInvalidSignature,
    #[error("token is expired")]
    TokenExpired,
    #[error("token service_scope does not match")]
    TokenWrongServiceScope,
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        401
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::TokenMalformed => "denied_token_malformed",
            AuthError::TokenInvalidSignature => "denied_token_invalid_signature",
            AuthError::TokenExpired => "denied_token_expired",
            AuthError::TokenWrongServiceScope => "denied_token_wrong_service_scope",
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// HS256 JWS verifier. Signature comparison and expiry checking are both
/// handled by `jsonwebtoken`'s `decode`, which compares the signature in
/// constant time and accepts a leeway window for clock skew.
pub struct HmacJwtVerifier {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    service_scope: String,
    clock_skew_seconds: u64,
}

impl HmacJwtVerifier {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        service_scope: impl Into<String>,
        clock_skew: Duration,
    ) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            service_scope: service_scope.into(),
            clock_skew_seconds: clock_skew.num_seconds().max(0) as u64,
        }
    }
}

#[async_trait]
impl TokenVerifier for HmacJwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(EXPECTED_ALGORITHM);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_audience(&[self.audience.clone()]);
        validation.leeway = self.clock_skew_seconds;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::TokenInvalidSignature,
                _ => AuthError::TokenMalformed,
            }
        })?;

        if data.claims.service_scope != self.service_scope {
            return Err(AuthError::TokenWrongServiceScope);
        }

        Ok(data.claims)
    }
}
