//! # Delivery
//!
//! Backend for a food-delivery service: a catalog of categories and items,
//! delivery addresses, client and admin users, and orders with their lines,
//! exposed as a JSON REST API behind bearer-token authentication.
//!
//! ## Features
//!
//! - **Declarative validation**: every write payload is filtered and checked
//!   before it reaches a handler
//! - **Atomic composite writes**: a user with their address, an order with
//!   all its lines
//! - **Order workflow**: PENDING orders move once to COMPLETED or CANCELLED
//! - **Two backends**: in-memory (default) and PostgreSQL (`postgres` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use delivery::prelude::*;
//!
//! let app = ServerBuilder::new()
//!     .with_config(AppConfig::from_env()?)
//!     .with_gateway(InMemoryGateway::new())
//!     .build()?;
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AdminUser, AuthContext, AuthPolicy, CurrentUser, TokenService},
        entity::{
            Address, Category, EntityKind, Item, Order, OrderFilter, OrderLine, OrderStatus,
            PaymentMethod, Role, User,
        },
        error::{DeliveryError, DeliveryResult},
        id::EntityId,
        service::{
            AddressService, CategoryService, Gateway, ItemService, OrderService, UserService,
        },
        upload::{ImageStore, LocalImageStore},
        validation::{EntityValidationConfig, Operation, ValidatableEntity, Validated},
    };

    // === Storage ===
    pub use crate::storage::InMemoryGateway;
    #[cfg(feature = "postgres")]
    pub use crate::storage::{PostgresGateway, ensure_schema};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{AppState, EntityDescriptor, EntityRegistry, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
