//! Gateway backends

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryGateway;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresGateway, ensure_schema};
