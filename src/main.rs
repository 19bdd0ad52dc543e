use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showtime_inventory::{
    config::Config,
    controllers,
    database::Database,
    redis_client::RedisClient,
    store::{PgRecordStore, RedisHoldStore},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(&config);

    info!("Starting Showtime Inventory API ({})", config.app.environment);

    // Connect to the database
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected");

    db.run_migrations()
        .await
        .context("Failed to run migrations")?;

    // Connect to Redis
    let redis = RedisClient::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connected");

    let state = AppState::new(
        Arc::new(PgRecordStore::new(db.clone())),
        Arc::new(RedisHoldStore::new(redis)),
        &config.schedule,
        &config.holds,
    );

    let app = controllers::app(state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}
