/// Auth Orchestrator
///
/// Coordinates the token codec, credential verifier, refresh token store and
/// revocation cache to implement registration, login, logout and refresh.
/// Owns all business invariants; collaborators are injected as capability
/// ports so the orchestrator stays testable with fakes.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::blacklist::TokenBlacklist;
use crate::auth::password::PasswordEncoder;
use crate::auth::refresh_token::{RefreshToken, RefreshTokenStore};
use crate::auth::token::TokenCodec;
use crate::auth::user::{Role, User, UserStore};
use crate::error::{AppError, AuthError};

/// Transient access/refresh pair returned to the caller; never persisted
#[derive(Debug, serde::Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    passwords: Arc<dyn PasswordEncoder>,
    codec: TokenCodec,
    blacklist: Arc<TokenBlacklist>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        passwords: Arc<dyn PasswordEncoder>,
        codec: TokenCodec,
        blacklist: Arc<TokenBlacklist>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            passwords,
            codec,
            blacklist,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn blacklist(&self) -> &TokenBlacklist {
        &self.blacklist
    }

    /// Register a new user with the default role. No token is issued.
    ///
    /// # Errors
    /// `UserAlreadyExists` if the email is already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        if self.users.exists_by_email(email).await? {
            return Err(AuthError::UserAlreadyExists(email.to_string()).into());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: self.passwords.hash(password)?,
            role: Role::User,
        };

        let user = self.users.save(user).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Authenticate with email and password, issuing a fresh token pair.
    ///
    /// Lookup failure and hash mismatch collapse into the same
    /// `InvalidCredentials` to avoid user enumeration. Login does not revoke
    /// prior refresh tokens; concurrent sessions collapse to a single chain
    /// on the first refresh.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthToken, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.matches(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.issue_token_pair(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair (rotation).
    ///
    /// The presented token and all of its siblings are revoked before the
    /// replacement is persisted, so old and new are never valid together.
    ///
    /// # Errors
    /// `InvalidToken` if the token is unknown, revoked or expired;
    /// `InvalidCredentials` if the owning user vanished
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthToken, AppError> {
        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("Refresh token not found".to_string()))?;

        if !stored.is_valid() {
            return Err(
                AuthError::InvalidToken("Refresh token is revoked or expired".to_string()).into(),
            );
        }

        let user = self
            .users
            .find_by_email(&stored.user_email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Rotation happens before reissue
        self.refresh_tokens.revoke_all_for_user(&user.email).await?;

        let tokens = self.issue_token_pair(&user).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Tear down a session. Never fails to the caller; store errors are
    /// logged and swallowed.
    ///
    /// The access token is blacklisted unconditionally - an expired or
    /// malformed token is harmless and still recorded. If the refresh token
    /// resolves to a stored record, every token of that record's user is
    /// revoked.
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) {
        self.blacklist.blacklist(access_token);

        let Some(value) = refresh_token else {
            return;
        };

        match self.refresh_tokens.find_by_token(value).await {
            Ok(Some(stored)) => {
                if let Err(e) = self
                    .refresh_tokens
                    .revoke_all_for_user(&stored.user_email)
                    .await
                {
                    tracing::error!(error = %e, "Failed to revoke refresh tokens during logout");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve refresh token during logout");
            }
        }
    }

    /// Resolve the authenticated identity back to its user record
    pub async fn current_user(&self, email: &str) -> Result<User, AppError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::InvalidCredentials.into())
    }

    /// Delete refresh tokens past their expiration; scheduled from startup
    pub async fn purge_expired_refresh_tokens(&self) -> Result<u64, AppError> {
        self.refresh_tokens.delete_expired().await
    }

    async fn issue_token_pair(&self, user: &User) -> Result<AuthToken, AppError> {
        let access_token = self.codec.issue_access_token(user)?;
        let refresh_token = self.codec.issue_refresh_token(user)?;

        let expires_at = Utc::now() + Duration::seconds(self.codec.refresh_token_expiry());
        self.refresh_tokens
            .save(RefreshToken::new(
                refresh_token.clone(),
                user.email.clone(),
                expires_at,
            ))
            .await?;

        Ok(AuthToken {
            access_token,
            refresh_token,
        })
    }
}
