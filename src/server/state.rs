//! Shared request state

use crate::config::AppConfig;
use crate::core::auth::TokenService;
use crate::core::service::Gateway;
use crate::core::upload::ImageStore;
use axum::extract::FromRef;
use std::sync::Arc;

/// Everything a handler may reach, built once at startup
///
/// Every field is cheap to clone. `FromRef` lets extractors such as
/// `CurrentUser` pull the token service straight out of the state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub tokens: TokenService,
    pub images: Arc<dyn ImageStore>,
    pub config: Arc<AppConfig>,
}
