//! Entity descriptor for Order

use super::handlers::{create_order, delete_order, get_order, list_orders, update_order};
use crate::server::{AppState, EntityDescriptor};
use axum::{Router, routing::get};

/// Descriptor for the Order entity
pub struct OrderDescriptor;

impl EntityDescriptor for OrderDescriptor {
    fn entity_type(&self) -> &str {
        "order"
    }

    fn plural(&self) -> &str {
        "orders"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/orders", get(list_orders).post(create_order))
            .route(
                "/orders/{id}",
                get(get_order).put(update_order).delete(delete_order),
            )
    }
}
