/// Credential extraction and cookie construction
///
/// Both token cookies are HTTP-only, Secure, Path "/", SameSite=Strict.
/// Cleared with max-age 0 on logout.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 15 * 60;
const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

pub fn access_token_cookie(value: &str) -> Cookie<'static> {
    build(ACCESS_TOKEN_COOKIE, value.to_string(), ACCESS_TOKEN_MAX_AGE_SECS)
}

pub fn refresh_token_cookie(value: &str) -> Cookie<'static> {
    build(REFRESH_TOKEN_COOKIE, value.to_string(), REFRESH_TOKEN_MAX_AGE_SECS)
}

/// An empty, immediately-expiring replacement used to clear a cookie
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    build(name, String::new(), 0)
}

fn build(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(true)
        .path("/")
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_secs))
        .finish()
}

/// Extract a cookie value from the request
pub fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name).map(|c| c.value().to_string())
}

/// Extract the token from an `Authorization: Bearer` header
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}
