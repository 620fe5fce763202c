//! Entity descriptor for User

use super::handlers::{create_user, delete_user, get_user, list_users, update_user};
use crate::server::{AppState, EntityDescriptor};
use axum::{Router, routing::get};

/// Descriptor for the User entity
pub struct UserDescriptor;

impl EntityDescriptor for UserDescriptor {
    fn entity_type(&self) -> &str {
        "user"
    }

    fn plural(&self) -> &str {
        "users"
    }

    fn build_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
    }
}
