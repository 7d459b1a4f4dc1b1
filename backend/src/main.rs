//! Opportunity Pipeline - backend server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use pipeline_backend::{
    config::{Config, StoreBackend},
    create_app,
    external::ExchangeRateApiClient,
    services::{triggers, RateCache},
    store::{MemoryStore, PgDocumentStore, SharedStore},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pipeline_server=debug,pipeline_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Opportunity Pipeline Server");
    tracing::info!("Environment: {}", config.environment);

    let store = connect_store(&config).await?;

    let provider = ExchangeRateApiClient::with_base_url(
        config.exchange_rate.api_base_url.clone(),
        Duration::from_secs(config.exchange_rate.timeout_secs),
    );
    let rate_cache = RateCache::new(store.clone(), Arc::new(provider), &config.exchange_rate);

    // Promote customers on their first sale
    let _listener = triggers::spawn_first_sale_listener(store.clone());

    let port = config.server.port;
    let state = AppState::new(store, rate_cache, config);
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<SharedStore> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database.url)
                .await?;
            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            Ok(Arc::new(PgDocumentStore::new(db_pool)))
        }
    }
}
