use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use haul_api::{app, AppState, AuthConfig};
use haul_core::{ProcessLogRepository, WarehouseStore};
use haul_store::app_config::{Config, StorageBackend};
use haul_store::{DbClient, MemoryWarehouseStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "haul_api=debug,haul_order=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Haul API on port {}", config.server.port);

    let (warehouse, process_log): (Arc<dyn WarehouseStore>, Arc<dyn ProcessLogRepository>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; state is lost on restart");
                let store = MemoryWarehouseStore::new();
                (Arc::new(store.clone()), Arc::new(store))
            }
            StorageBackend::Postgres => {
                let database = config
                    .database
                    .as_ref()
                    .context("storage.backend = postgres without [database]")?;
                let db = DbClient::new(&database.url)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                (Arc::new(db.warehouse_store()), Arc::new(db.process_log_repository()))
            }
        };

    let app_state = AppState::new(
        warehouse,
        process_log,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        config.events.channel_capacity,
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
