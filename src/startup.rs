use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{
    AuthService, BcryptPasswordEncoder, PgRefreshTokenStore, PgUserStore, TokenBlacklist,
    TokenCodec,
};
use crate::configuration::JwtSettings;
use crate::middleware::AuthGate;
use crate::routes::{health_check, login, logout, me, refresh, register};

/// Wire the orchestrator with its production collaborators
pub fn build_auth_service(pool: PgPool, jwt: JwtSettings) -> Arc<AuthService> {
    Arc::new(AuthService::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool)),
        Arc::new(BcryptPasswordEncoder),
        TokenCodec::new(jwt),
        Arc::new(TokenBlacklist::default()),
    ))
}

pub fn run(listener: TcpListener, auth: Arc<AuthService>) -> Result<Server, std::io::Error> {
    let auth_data = web::Data::from(auth.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            // The gate runs once per request and never rejects by itself
            .wrap(AuthGate::new(auth.clone()))
            .app_data(auth_data.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/me", web::get().to(me))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
