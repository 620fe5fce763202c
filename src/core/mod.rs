//! Core domain: records, validation, authorization, gateway contracts and
//! the order workflow

pub mod auth;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod id;
pub mod password;
pub mod service;
pub mod upload;
pub mod validation;
pub mod workflow;

pub use auth::{AdminUser, AuthContext, AuthPolicy, CurrentUser, TokenService};
pub use entity::{EntityKind, OrderStatus, PaymentMethod, Role};
pub use error::{DeliveryError, DeliveryResult};
pub use extractors::IdPath;
pub use id::EntityId;
pub use service::{
    AddressService, CategoryService, Gateway, ItemService, OrderService, UserService,
};
pub use upload::{ImageStore, LocalImageStore};
