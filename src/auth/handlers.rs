//! Login handler

use super::model::{LoginRequest, LoginResponse};
use crate::core::error::{AuthenticationError, DeliveryResult};
use crate::core::password::verify_password;
use crate::core::validation::Validated;
use crate::server::AppState;
use axum::{Json, extract::State};

/// Check the credentials and issue a token
///
/// An unknown email and a wrong password produce the same error.
pub async fn login(
    State(state): State<AppState>,
    Validated(input): Validated<LoginRequest>,
) -> DeliveryResult<Json<LoginResponse>> {
    let Some(credentials) = state.gateway.find_credentials_by_email(&input.email).await? else {
        tracing::warn!(email = %input.email, "login with unknown email");
        return Err(AuthenticationError::InvalidCredentials.into());
    };

    if !verify_password(input.password, credentials.password_hash.clone()).await? {
        tracing::warn!(user_id = %credentials.id, "login with wrong password");
        return Err(AuthenticationError::InvalidCredentials.into());
    }

    let token = state.tokens.issue(credentials.id, credentials.role)?;
    tracing::info!(user_id = %credentials.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: credentials.into(),
    }))
}
