//! Entity descriptor for Address

use super::handlers::{create_address, delete_address, get_address, list_addresses, update_address};
use crate::server::{AppState, EntityDescriptor};
use axum::{Router, routing::get};

/// Descriptor for the Address entity
pub struct AddressDescriptor;

impl EntityDescriptor for AddressDescriptor {
    fn entity_type(&self) -> &str {
        "address"
    }

    fn plural(&self) -> &str {
        "addresses"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/addresses", get(list_addresses).post(create_address))
            .route(
                "/addresses/{id}",
                get(get_address).put(update_address).delete(delete_address),
            )
    }
}
