/// JWT Claims structure
///
/// Represents the payload of a signed token: the subject (user email), a
/// role claim, a unique token id and the standard timing claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Role claim, carried forward as-is
    pub role: String,
    /// Unique token id, for auditability
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create new claims for a user
    ///
    /// # Arguments
    /// * `email` - User's email address (becomes the subject)
    /// * `role` - Role claim
    /// * `ttl_seconds` - Token expiration in seconds from now
    /// * `issuer` - Issuer identifier
    pub fn new(email: &str, role: &str, ttl_seconds: i64, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: email.to_string(),
            role: role.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: now + ttl_seconds,
            iat: now,
            iss: issuer.to_string(),
        }
    }

    /// Check if the claims are past their expiration
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}
