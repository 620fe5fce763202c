//! Login
//!
//! Exchanges an email and password for a bearer token. Verifying tokens on
//! later requests is the job of the extractors in [`crate::core::auth`].

pub mod handlers;
pub mod model;

pub use handlers::login;
pub use model::{LoginRequest, LoginResponse, LoginUser};

use crate::server::AppState;
use axum::{Router, routing::post};

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}
