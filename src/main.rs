use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::time::Duration;

use auth_server::configuration::get_configuration;
use auth_server::startup::{build_auth_service, run};
use auth_server::telemetry::init_telemetry;

const SWEEP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    let auth = build_auth_service(pool, configuration.jwt.clone());

    // Periodic sweeps run decoupled from request handling
    {
        let auth = auth.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let removed = auth.blacklist().sweep();
                tracing::info!(removed, "Blacklist sweep complete");
            }
        });
    }
    {
        let auth = auth.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match auth.purge_expired_refresh_tokens().await {
                    Ok(removed) => {
                        tracing::info!(removed, "Expired refresh tokens deleted");
                    }
                    Err(e) => {
                        tracing::error!("Failed to delete expired refresh tokens: {}", e);
                    }
                }
            }
        });
    }

    let address = format!("127.0.0.1:{}", configuration.application.port);
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, auth)?;
    tracing::info!("Server started successfully");

    let _ = server.await;

    Ok(())
}
