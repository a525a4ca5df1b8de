//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT validation settings.
///
/// Token issuance is owned by the platform's auth service; this subsystem
/// only validates bearer tokens to resolve the calling user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for JWT signature validation.
    pub jwt_secret: String,
    /// Expected token issuer, if any.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Clock-skew leeway in seconds when validating `exp`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

fn default_leeway() -> u64 {
    30
}
