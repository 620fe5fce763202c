//! HTTP server: shared state, entity route registry and the builder that
//! assembles them

pub mod builder;
pub mod entity_registry;
pub mod state;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use state::AppState;
