//! Entity registry collecting the route set of every entity

use super::state::AppState;
use axum::Router;
use std::collections::BTreeMap;

/// Describes how to build the routes of one entity
///
/// Each entity (category, item, order, ...) implements this trait next to
/// its handlers.
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "order")
    fn entity_type(&self) -> &str;

    /// The plural form, also the collection path (e.g., "orders")
    fn plural(&self) -> &str;

    /// Build the routes of this entity
    ///
    /// Routes are typically:
    /// - GET/POST /{plural}
    /// - GET/PUT/DELETE /{plural}/{id}
    fn build_routes(&self) -> Router<AppState>;
}

/// Registry for all entities served by the application
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: BTreeMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity descriptor
    ///
    /// A descriptor registered under an existing entity type replaces it.
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Merge the routes of every registered entity into one router
    pub fn build_routes(&self) -> Router<AppState> {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                router.merge(descriptor.build_routes())
            })
    }

    /// Registered entity types, sorted
    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    /// Collection paths of every registered entity, sorted by entity type
    pub fn collection_paths(&self) -> Vec<String> {
        self.descriptors
            .values()
            .map(|d| format!("/{}", d.plural()))
            .collect()
    }
}
