//! Integration tests for PostgresGateway using the gateway test harness.
//!
//! Invokes `gateway_tests!` to validate that the PostgreSQL backend fully
//! conforms to the gateway contract.
//!
//! # Requirements
//!
//! - Docker must be running (testcontainers launches a PostgreSQL container)
//! - Feature flag `postgres` must be enabled
//!
//! # Running
//!
//! ```sh
//! cargo test --features postgres --test postgres_tests -- --test-threads=1
//! ```
//!
//! # Test isolation
//!
//! All tests share a single PostgreSQL container (via `OnceLock`). Each test
//! creates a fresh `PgPool` and truncates every table, restarting the id
//! sequences, before running.

#![cfg(feature = "postgres")]

#[macro_use]
mod gateway_harness;

use delivery::storage::postgres::{PostgresGateway, TABLES, ensure_schema};
use gateway_harness::*;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::OnceLock;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

// ---------------------------------------------------------------------------
// Shared test environment (single container, fresh pool per test)
// ---------------------------------------------------------------------------

/// Holds the testcontainer handle (keeps it alive) and the connection URL.
///
/// The container lives in a process-global `OnceLock` so it survives across
/// the runtimes created by `#[tokio::test]`. Each test builds its own pool
/// from the URL.
struct PgTestEnv {
    /// Dropping this stops the PostgreSQL container.
    _container: testcontainers::ContainerAsync<Postgres>,
    connection_url: String,
}

static TEST_ENV: OnceLock<PgTestEnv> = OnceLock::new();

/// Start the shared PostgreSQL container and create the schema once.
async fn init_pg_env() -> &'static PgTestEnv {
    if let Some(env) = TEST_ENV.get() {
        return env;
    }

    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start PostgreSQL container, is Docker running?");

    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to PostgreSQL");
    ensure_schema(&pool).await.expect("Failed to create schema");
    // the setup pool belongs to this test's runtime
    pool.close().await;

    let env = PgTestEnv {
        _container: container,
        connection_url: url,
    };
    let _ = TEST_ENV.set(env);
    TEST_ENV.get().unwrap()
}

async fn pg_pool() -> PgPool {
    let env = init_pg_env().await;
    PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&env.connection_url)
        .await
        .expect("Failed to connect to PostgreSQL")
}

// ---------------------------------------------------------------------------
// Factory (truncate before each test for isolation)
// ---------------------------------------------------------------------------

async fn clean_pg_gateway() -> PostgresGateway {
    let pool = pg_pool().await;
    sqlx::query(&format!(
        "TRUNCATE {} RESTART IDENTITY CASCADE",
        TABLES.join(", ")
    ))
    .execute(&pool)
    .await
    .expect("Failed to truncate tables");
    PostgresGateway::new(pool)
}

// ---------------------------------------------------------------------------
// Test suites via macros
// ---------------------------------------------------------------------------

gateway_tests!(clean_pg_gateway().await);

mod schema {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let pool = pg_pool().await;
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
