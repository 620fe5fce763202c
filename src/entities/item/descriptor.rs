//! Entity descriptor for Item

use super::handlers::{
    create_item, delete_item, get_item, list_items, update_item, upload_item_image,
};
use crate::core::upload::MAX_IMAGE_BYTES;
use crate::server::{AppState, EntityDescriptor};
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};

/// Room for multipart framing around the largest accepted image
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Descriptor for the Item entity
pub struct ItemDescriptor;

impl EntityDescriptor for ItemDescriptor {
    fn entity_type(&self) -> &str {
        "item"
    }

    fn plural(&self) -> &str {
        "items"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/items", get(list_items).post(create_item))
            .route(
                "/items/{id}",
                get(get_item).put(update_item).delete(delete_item),
            )
            .route(
                "/items/{id}/image",
                post(upload_item_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            )
    }
}
