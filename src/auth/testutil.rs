//! In-memory fakes for the auth capability ports, shared across unit tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::auth::blacklist::TokenBlacklist;
use crate::auth::password::PasswordEncoder;
use crate::auth::refresh_token::{RefreshToken, RefreshTokenStore};
use crate::auth::service::AuthService;
use crate::auth::token::TokenCodec;
use crate::auth::user::{User, UserStore};
use crate::configuration::JwtSettings;
use crate::error::AppError;

pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn remove(&self, email: &str) {
        self.users.lock().unwrap().remove(email);
    }

    pub fn get(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().get(email).cloned()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn save(&self, user: User) -> Result<User, AppError> {
        self.users
            .lock()
            .unwrap()
            .insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().get(email).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.lock().unwrap().contains_key(email))
    }
}

pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<Vec<RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn expire(&self, value: &str) {
        let mut tokens = self.tokens.lock().unwrap();
        for token in tokens.iter_mut().filter(|t| t.token == value) {
            token.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, AppError> {
        let mut saved = token;
        saved.id = saved.id.or_else(|| Some(uuid::Uuid::new_v4()));
        self.tokens.lock().unwrap().push(saved.clone());
        Ok(saved)
    }

    async fn find_by_token(&self, value: &str) -> Result<Option<RefreshToken>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token == value)
            .cloned())
    }

    async fn revoke_all_for_user(&self, user_email: &str) -> Result<(), AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        for token in tokens.iter_mut().filter(|t| t.user_email == user_email) {
            token.revoked = true;
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        let now = Utc::now();
        tokens.retain(|t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}

/// Reversible stand-in so orchestrator tests stay fast
pub struct FakePasswordEncoder;

impl PasswordEncoder for FakePasswordEncoder {
    fn hash(&self, raw: &str) -> Result<String, AppError> {
        Ok(format!("fake-digest:{}", raw))
    }

    fn matches(&self, raw: &str, digest: &str) -> Result<bool, AppError> {
        Ok(digest == format!("fake-digest:{}", raw))
    }
}

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "test".to_string(),
    }
}

pub struct TestHarness {
    pub service: Arc<AuthService>,
    pub users: Arc<InMemoryUserStore>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
}

impl TestHarness {
    pub fn user_hash(&self, email: &str) -> String {
        self.users.get(email).expect("user not found").password_hash
    }

    pub fn remove_user(&self, email: &str) {
        self.users.remove(email);
    }

    pub fn expire_refresh_token(&self, value: &str) {
        self.refresh_tokens.expire(value);
    }
}

pub fn test_service() -> TestHarness {
    test_service_with_jwt(test_jwt_settings())
}

pub fn test_service_with_jwt(jwt: JwtSettings) -> TestHarness {
    let users = Arc::new(InMemoryUserStore::new());
    let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
    let service = Arc::new(AuthService::new(
        users.clone(),
        refresh_tokens.clone(),
        Arc::new(FakePasswordEncoder),
        TokenCodec::new(jwt),
        Arc::new(TokenBlacklist::default()),
    ));

    TestHarness {
        service,
        users,
        refresh_tokens,
    }
}
