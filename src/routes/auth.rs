/// Authentication Routes
///
/// Registration, login, token refresh, logout and current user information.
/// Domain errors from the orchestrator map to status codes via `AppError`;
/// these handlers only do DTO validation and cookie plumbing.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{
    access_token_cookie, bearer_token, cookie_value, expired_cookie, refresh_token_cookie,
    AuthService, User, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::error::{AppError, AuthError};
use crate::middleware::AuthenticatedUser;
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Public view of a user
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            role: user.role.as_str().to_string(),
        }
    }
}

/// POST /auth/register
///
/// Register a new user with email and password. No token is issued; the
/// client logs in afterwards.
///
/// # Errors
/// - 400: invalid email format or weak password
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;

    let user = auth.register(&email, &form.password).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /auth/login
///
/// Authenticate with email and password. Returns the token pair in the body
/// and also sets the token cookies for browser clients.
///
/// # Security Notes
/// - Same error for "not found" and "wrong password" (no user enumeration)
///
/// # Errors
/// - 400: invalid email format
/// - 401: invalid credentials
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;

    let tokens = auth.login(&email, &form.password).await?;

    Ok(HttpResponse::Ok()
        .cookie(access_token_cookie(&tokens.access_token))
        .cookie(refresh_token_cookie(&tokens.refresh_token))
        .json(AuthResponse {
            expires_in: auth.codec().access_token_expiry(),
            token_type: "Bearer".to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }))
}

/// POST /auth/refresh
///
/// Exchange a refresh token (JSON body, or the refresh cookie) for a new
/// token pair. The old token and its siblings are revoked (rotation).
///
/// # Errors
/// - 401: refresh token missing, unknown, revoked or expired
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = body
        .map(|b| b.refresh_token.clone())
        .or_else(|| cookie_value(&req, REFRESH_TOKEN_COOKIE))
        .ok_or(AuthError::MissingToken)?;

    let tokens = auth.refresh(&refresh_token).await?;

    Ok(HttpResponse::Ok()
        .cookie(access_token_cookie(&tokens.access_token))
        .cookie(refresh_token_cookie(&tokens.refresh_token))
        .json(AuthResponse {
            expires_in: auth.codec().access_token_expiry(),
            token_type: "Bearer".to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }))
}

/// POST /auth/logout
///
/// Tear down the session: blacklist the presented access token, revoke the
/// refresh chain if a refresh cookie is present, clear both cookies. Always
/// answers 200; logging out twice is harmless.
pub async fn logout(req: HttpRequest, auth: web::Data<AuthService>) -> HttpResponse {
    let access_token =
        bearer_token(&req).or_else(|| cookie_value(&req, ACCESS_TOKEN_COOKIE));
    let refresh_token = cookie_value(&req, REFRESH_TOKEN_COOKIE);

    if let Some(access_token) = access_token {
        auth.logout(&access_token, refresh_token.as_deref()).await;
    }

    HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(expired_cookie(REFRESH_TOKEN_COOKIE))
        .json(serde_json::json!({ "message": "Session terminated" }))
}

/// GET /auth/me
///
/// Current authenticated user's information, from the identity the gate
/// established.
///
/// # Errors
/// - 401: no authenticated identity on the request
pub async fn me(
    identity: Option<web::ReqData<AuthenticatedUser>>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let identity = identity.ok_or(AuthError::MissingToken)?;

    let user = auth.current_user(&identity.email).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
