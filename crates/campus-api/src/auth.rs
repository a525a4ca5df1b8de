//! JWT bearer token validation.
//!
//! Token issuance is owned by the platform's auth service; this layer only
//! validates signatures and resolves the calling user.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_core::config::auth::AuthConfig;
use campus_core::error::AppError;
use campus_core::result::AppResult;
use campus_service::context::RequestContext;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's ID.
    pub sub: Uuid,
    /// Username at issuance time.
    pub username: String,
    /// Role at issuance time.
    pub role: String,
    /// Expiration (seconds since epoch).
    pub exp: u64,
    /// Issuer, when the platform sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Validates bearer tokens against the shared HMAC secret.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Build a validator from the auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and resolve it to a request context.
    pub fn validate(&self, token: &str) -> AppResult<RequestContext> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {e}")))?;
        let claims = data.claims;
        Ok(RequestContext::new(claims.sub, claims.role, claims.username))
    }
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator").finish_non_exhaustive()
    }
}
