/// Token Codec
///
/// Creates and parses signed, expiring identity tokens. Stateless; purely a
/// function of the configured secret. The same codec issues both access
/// tokens (short ttl) and refresh tokens (long ttl) - only the ttl differs.

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::auth::user::User;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Outcome of decoding a token
///
/// `Expired` is reported only when the signature verified and the sole
/// failure is a past expiration; any other failure (malformed input, bad
/// signature, wrong issuer) is `Invalid`. The gate's refresh-vs-reject
/// branch depends on this distinction.
#[derive(Debug)]
pub enum TokenStatus {
    Valid(Claims),
    Expired,
    Invalid,
}

#[derive(Clone)]
pub struct TokenCodec {
    settings: JwtSettings,
}

impl TokenCodec {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.settings.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> i64 {
        self.settings.refresh_token_expiry
    }

    /// Produce a signed token for a user with the given ttl
    ///
    /// Embeds subject = email, the role claim, a freshly generated token id,
    /// issued-at = now and expiration = now + ttl.
    ///
    /// # Errors
    /// Returns error if token encoding fails
    pub fn issue(&self, user: &User, ttl_seconds: i64) -> Result<String, AppError> {
        let claims = Claims::new(
            &user.email,
            user.role.as_str(),
            ttl_seconds,
            &self.settings.issuer,
        );

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        self.issue(user, self.settings.access_token_expiry)
    }

    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        self.issue(user, self.settings.refresh_token_expiry)
    }

    /// Verify signature and expiration, returning a tagged status
    pub fn decode(&self, token: &str) -> TokenStatus {
        let mut validation = Validation::new(Algorithm::HS256);
        // Zero leeway so expiry checks are exact
        validation.leeway = 0;
        validation.set_issuer(&[&self.settings.issuer]);

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => TokenStatus::Valid(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => TokenStatus::Expired,
                _ => TokenStatus::Invalid,
            },
        }
    }

    /// Extract the subject (email) from a token
    ///
    /// # Errors
    /// `AuthError::TokenExpired` for a signature-valid but expired token,
    /// `AuthError::TokenInvalid` for any other failure.
    pub fn extract_subject(&self, token: &str) -> Result<String, AppError> {
        match self.decode(token) {
            TokenStatus::Valid(claims) => Ok(claims.sub),
            TokenStatus::Expired => Err(AuthError::TokenExpired.into()),
            TokenStatus::Invalid => Err(AuthError::TokenInvalid.into()),
        }
    }

    /// True iff the token decodes without any error
    pub fn is_valid(&self, token: &str) -> bool {
        matches!(self.decode(token), TokenStatus::Valid(_))
    }

    /// True iff decoding fails specifically due to expiration
    pub fn is_expired(&self, token: &str) -> bool {
        matches!(self.decode(token), TokenStatus::Expired)
    }
}
