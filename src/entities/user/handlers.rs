//! User HTTP handlers

use super::model::{RegisterUser, UpdateUser};
use crate::core::auth::{AdminUser, AuthContext, AuthPolicy, CurrentUser};
use crate::core::entity::{EntityKind, NewUser, Role, User, UserChanges};
use crate::core::error::{AuthorizationError, DeliveryResult, NotFoundError};
use crate::core::extractors::IdPath;
use crate::core::password::hash_password;
use crate::core::validation::Validated;
use crate::server::AppState;
use axum::{Json, extract::State, http::StatusCode};

/// Public registration; only an admin may register another admin
pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthContext,
    Validated(input): Validated<RegisterUser>,
) -> DeliveryResult<(StatusCode, Json<User>)> {
    if input.role == Role::Admin {
        AuthPolicy::AdminOnly.enforce(&caller)?;
    }

    let password_hash = hash_password(input.password, state.config.bcrypt_cost).await?;
    let user = state
        .gateway
        .create_user_with_address(NewUser {
            name: input.name,
            email: input.email,
            phone: input.phone,
            role: input.role,
            password_hash,
            address: input.address,
        })
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> DeliveryResult<Json<Vec<User>>> {
    Ok(Json(state.gateway.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
) -> DeliveryResult<Json<User>> {
    state
        .gateway
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFoundError::new(EntityKind::User, id).into())
}

/// The user themself or an admin; promoting to ADMIN takes an admin
pub async fn update_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    IdPath(id): IdPath,
    Validated(input): Validated<UpdateUser>,
) -> DeliveryResult<Json<User>> {
    AuthPolicy::SelfOrAdmin(id).enforce(&caller.context())?;
    if input.role == Some(Role::Admin) && !caller.is_admin() {
        return Err(AuthorizationError::AdminRequired.into());
    }

    let password_hash = match input.password {
        Some(password) => Some(hash_password(password, state.config.bcrypt_cost).await?),
        None => None,
    };
    let changes = UserChanges {
        name: input.name,
        email: input.email,
        phone: input.phone,
        role: input.role,
        password_hash,
        address_id: input.address_id,
    };
    Ok(Json(state.gateway.update_user(id, changes).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    IdPath(id): IdPath,
) -> DeliveryResult<StatusCode> {
    AuthPolicy::SelfOrAdmin(id).enforce(&caller.context())?;
    state.gateway.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
