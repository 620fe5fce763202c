//! Category HTTP handlers

use crate::core::auth::AdminUser;
use crate::core::entity::{Category, CategoryChanges, EntityKind, NewCategory};
use crate::core::error::{DeliveryResult, NotFoundError};
use crate::core::extractors::IdPath;
use crate::core::validation::Validated;
use crate::server::AppState;
use axum::{Json, extract::State, http::StatusCode};

pub async fn list_categories(State(state): State<AppState>) -> DeliveryResult<Json<Vec<Category>>> {
    Ok(Json(state.gateway.list_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> DeliveryResult<Json<Category>> {
    state
        .gateway
        .get_category(id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFoundError::new(EntityKind::Category, id).into())
}

pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Validated(input): Validated<NewCategory>,
) -> DeliveryResult<(StatusCode, Json<Category>)> {
    let category = state.gateway.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
    Validated(changes): Validated<CategoryChanges>,
) -> DeliveryResult<Json<Category>> {
    Ok(Json(state.gateway.update_category(id, changes).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
) -> DeliveryResult<StatusCode> {
    state.gateway.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
