//! Delivery server binary
//!
//! Reads its configuration from the environment (see [`AppConfig::from_env`]),
//! picks PostgreSQL when a database URL is configured and the `postgres`
//! feature is enabled, otherwise keeps everything in memory.

use anyhow::Result;
use delivery::config::AppConfig;
use delivery::core::Gateway;
use delivery::server::ServerBuilder;
use delivery::storage::InMemoryGateway;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let gateway = open_gateway(&config).await?;

    ServerBuilder::new()
        .with_config(config)
        .with_gateway_arc(gateway)
        .serve()
        .await
}

#[cfg(feature = "postgres")]
async fn open_gateway(config: &AppConfig) -> Result<Arc<dyn Gateway>> {
    use delivery::storage::{PostgresGateway, ensure_schema};
    use sqlx::postgres::PgPoolOptions;

    let Some(url) = config.database_url.as_deref() else {
        return Ok(in_memory());
    };
    let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
    ensure_schema(&pool).await?;
    tracing::info!("Using PostgreSQL storage");
    Ok(Arc::new(PostgresGateway::new(pool)))
}

#[cfg(not(feature = "postgres"))]
async fn open_gateway(config: &AppConfig) -> Result<Arc<dyn Gateway>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is disabled");
    }
    Ok(in_memory())
}

fn in_memory() -> Arc<dyn Gateway> {
    tracing::warn!("Using in-memory storage; data is lost on restart");
    Arc::new(InMemoryGateway::new())
}
