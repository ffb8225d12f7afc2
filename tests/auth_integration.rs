use auth_server::configuration::{get_configuration, DatabaseSettings, JwtSettings};
use auth_server::startup::{build_auth_service, run};
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawn the server against a throwaway database, with a hook to bend the
/// JWT settings (e.g. a negative access expiry to exercise silent refresh).
async fn spawn_app_with(customize: impl FnOnce(&mut JwtSettings)) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let mut jwt_config = configuration.jwt.clone();
    customize(&mut jwt_config);

    let auth = build_auth_service(connection_pool.clone(), jwt_config);
    let server = run(listener, auth).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn register_user(app: &TestApp, email: &str, password: &str) {
    let response = reqwest::Client::new()
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
}

async fn login_user(app: &TestApp, email: &str, password: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Health check ---

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_and_persists_the_user() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({ "email": "John@Example.com", "password": "SecurePass123" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "john@example.com");
    assert_eq!(body["role"], "USER");
    // Registration issues no tokens
    assert!(body.get("access_token").is_none());

    let user = sqlx::query("SELECT email, password_hash FROM users WHERE email = 'john@example.com'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");
    assert_ne!(user.get::<String, _>("password_hash"), "SecurePass123");
}

#[tokio::test]
async fn register_returns_400_for_invalid_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_emails = vec!["notanemail", "user@", "@example.com", "user@@example.com"];

    for invalid_email in invalid_emails {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&json!({ "email": invalid_email, "password": "SecurePass123" }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid_email
        );
    }
}

#[tokio::test]
async fn register_returns_400_for_weak_password() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({ "email": "weak@example.com", "password": "short" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app().await;
    register_user(&app, "dup@example.com", "SecurePass123").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({ "email": "dup@example.com", "password": "OtherPass456" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_for_valid_credentials() {
    let app = spawn_app().await;
    register_user(&app, "user@example.com", "SecurePass123").await;

    let body = login_user(&app, "user@example.com", "SecurePass123").await;

    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn login_returns_401_for_wrong_password_and_unknown_user() {
    let app = spawn_app().await;
    register_user(&app, "user@example.com", "SecurePass123").await;
    let client = reqwest::Client::new();

    for (email, password) in [
        ("user@example.com", "WrongPass123"),
        ("ghost@example.com", "SecurePass123"),
    ] {
        let response = client
            .post(&format!("{}/auth/login", &app.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16());
    }
}

// --- Protected route ---

#[tokio::test]
async fn me_returns_the_authenticated_user() {
    let app = spawn_app().await;
    register_user(&app, "user@example.com", "SecurePass123").await;
    let tokens = login_user(&app, "user@example.com", "SecurePass123").await;

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/me", &app.address))
        .bearer_auth(tokens["access_token"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "user@example.com");
}

#[tokio::test]
async fn me_returns_401_without_a_token() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

// --- Refresh rotation ---

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = spawn_app().await;
    register_user(&app, "user@example.com", "SecurePass123").await;
    let tokens = login_user(&app, "user@example.com", "SecurePass123").await;
    let first_refresh_token = tokens["refresh_token"].as_str().unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": first_refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let rotated: Value = response.json().await.expect("Failed to parse response");
    assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);

    // The presented token and its siblings were invalidated together
    let replay = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": first_refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, replay.status().as_u16());
}

// --- Logout ---

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = spawn_app().await;
    register_user(&app, "user@example.com", "SecurePass123").await;
    let tokens = login_user(&app, "user@example.com", "SecurePass123").await;
    let access_token = tokens["access_token"].as_str().unwrap();
    let refresh_token = tokens["refresh_token"].as_str().unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/auth/logout", &app.address))
        .bearer_auth(access_token)
        .header("Cookie", format!("refresh_token={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    // The access token is blacklisted even though still unexpired
    let me = client
        .get(&format!("{}/auth/me", &app.address))
        .bearer_auth(access_token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, me.status().as_u16());

    // The refresh chain is gone too
    let refresh = client
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, refresh.status().as_u16());

    // Logging out again is harmless
    let again = client
        .post(&format!("{}/auth/logout", &app.address))
        .bearer_auth(access_token)
        .header("Cookie", format!("refresh_token={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, again.status().as_u16());
}

// --- Silent refresh ---

#[tokio::test]
async fn expired_access_token_with_refresh_cookie_is_silently_refreshed() {
    // Every access token this app issues is already expired
    let app = spawn_app_with(|jwt| jwt.access_token_expiry = -60).await;
    register_user(&app, "user@example.com", "SecurePass123").await;
    let tokens = login_user(&app, "user@example.com", "SecurePass123").await;
    let access_token = tokens["access_token"].as_str().unwrap();
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/me", &app.address))
        .bearer_auth(access_token)
        .header("Cookie", format!("refresh_token={}", refresh_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let new_access_token = response
        .headers()
        .get("x-new-access-token")
        .expect("x-new-access-token header missing");
    assert!(!new_access_token.is_empty());
}

#[tokio::test]
async fn expired_access_token_without_refresh_cookie_is_unauthorized() {
    let app = spawn_app_with(|jwt| jwt.access_token_expiry = -60).await;
    register_user(&app, "user@example.com", "SecurePass123").await;
    let tokens = login_user(&app, "user@example.com", "SecurePass123").await;

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/me", &app.address))
        .bearer_auth(tokens["access_token"].as_str().unwrap())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert!(response.headers().get("x-new-access-token").is_none());
}
