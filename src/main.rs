use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use chirpy::configuration::{get_configuration, StorageBackend};
use chirpy::startup::run;
use chirpy::store::{InMemoryStore, PgStore, RefreshTokenStore, UserStore};
use chirpy::telemetry::init_telemetry;

fn io_error(kind: std::io::ErrorKind, msg: &str) -> std::io::Error {
    std::io::Error::new(kind, msg.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        io_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let keys = configuration.auth.keys().map_err(|e| {
        tracing::error!("Invalid auth configuration: {}", e);
        io_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let (users, refresh_tokens): (Arc<dyn UserStore>, Arc<dyn RefreshTokenStore>) =
        match configuration.storage.backend {
            StorageBackend::Postgres => {
                tracing::info!("Attempting to connect to database");
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&configuration.database.connection_string())
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to create connection pool: {}", e);
                        io_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
                    })?;

                sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    io_error(std::io::ErrorKind::Other, "Migration error")
                })?;

                let store = Arc::new(PgStore::new(pool));
                (
                    store.clone() as Arc<dyn UserStore>,
                    store as Arc<dyn RefreshTokenStore>,
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let store = Arc::new(InMemoryStore::new());
                (
                    store.clone() as Arc<dyn UserStore>,
                    store as Arc<dyn RefreshTokenStore>,
                )
            }
        };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, users, refresh_tokens, keys)?.await
}
