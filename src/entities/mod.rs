//! Delivery entities
//!
//! Each entity lives in its own module with the same layout: `model` holds
//! the payload rules, `handlers` the HTTP handlers and `descriptor` the
//! routes it contributes to the server.

pub mod address;
pub mod category;
pub mod item;
pub mod order;
pub mod user;

pub use address::AddressDescriptor;
pub use category::CategoryDescriptor;
pub use item::ItemDescriptor;
pub use order::OrderDescriptor;
pub use user::UserDescriptor;

use crate::server::EntityRegistry;

/// Register every delivery entity
pub fn register_all(registry: &mut EntityRegistry) {
    registry.register(Box::new(CategoryDescriptor));
    registry.register(Box::new(AddressDescriptor));
    registry.register(Box::new(UserDescriptor));
    registry.register(Box::new(ItemDescriptor));
    registry.register(Box::new(OrderDescriptor));
}
