/// Authentication core
///
/// Token issuance/verification, password hashing, refresh token rotation,
/// the revocation cache and the orchestrator tying them together.

mod blacklist;
mod claims;
mod cookie;
mod password;
mod refresh_token;
mod service;
mod token;
mod user;

#[cfg(test)]
pub(crate) mod testutil;

pub use blacklist::TokenBlacklist;
pub use claims::Claims;
pub use cookie::{
    access_token_cookie, bearer_token, cookie_value, expired_cookie, refresh_token_cookie,
    ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use password::{BcryptPasswordEncoder, PasswordEncoder};
pub use refresh_token::{PgRefreshTokenStore, RefreshToken, RefreshTokenStore};
pub use service::{AuthService, AuthToken};
pub use token::{TokenCodec, TokenStatus};
pub use user::{PgUserStore, Role, User, UserStore};
