/// Refresh Token Storage
///
/// Durable record of issued refresh tokens. Token values are:
/// - Opaque to the store, looked up by the presented value
/// - Hashed with SHA-256 before storage (never store usable token values)
/// - Revoked in bulk per user on rotation or logout
/// - Physically deleted by the periodic expiry sweep

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Persisted refresh token record
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: Option<Uuid>,
    pub token: String,
    pub user_email: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn new(token: String, user_email: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            token,
            user_email,
            expires_at,
            revoked: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Combined validity predicate driving the refresh decision
    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }
}

/// Hash a token value for storage lookup
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Port for refresh token persistence
///
/// Mutations for one user must be serializable against concurrent calls;
/// the Postgres implementation rides on row-level locking of its single
/// UPDATE statement.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, AppError>;
    async fn find_by_token(&self, value: &str) -> Result<Option<RefreshToken>, AppError>;
    /// Mark every non-revoked record for the user as revoked; idempotent
    async fn revoke_all_for_user(&self, user_email: &str) -> Result<(), AppError>;
    /// Remove all records past expiration, regardless of the revoked flag
    async fn delete_expired(&self) -> Result<u64, AppError>;
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, AppError> {
        let id = token.id.unwrap_or_else(Uuid::new_v4);
        let token_hash = hash_token(&token.token);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, token_hash, user_email, expires_at, revoked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&token_hash)
        .bind(&token.user_email)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(RefreshToken {
            id: Some(id),
            ..token
        })
    }

    async fn find_by_token(&self, value: &str) -> Result<Option<RefreshToken>, AppError> {
        let token_hash = hash_token(value);

        let row = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>, bool)>(
            r#"
            SELECT id, user_email, expires_at, revoked
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, user_email, expires_at, revoked)| RefreshToken {
            id: Some(id),
            token: value.to_string(),
            user_email,
            expires_at,
            revoked,
        }))
    }

    async fn revoke_all_for_user(&self, user_email: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true, revoked_at = $1
            WHERE user_email = $2 AND revoked = false
            "#,
        )
        .bind(Utc::now())
        .bind(user_email)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_email = %user_email, "All refresh tokens revoked for user");
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
