//! Address HTTP handlers
//!
//! Every address route requires a signed-in caller.

use crate::core::auth::CurrentUser;
use crate::core::entity::{Address, AddressChanges, EntityKind, NewAddress};
use crate::core::error::{DeliveryResult, NotFoundError};
use crate::core::extractors::IdPath;
use crate::core::validation::Validated;
use crate::server::AppState;
use axum::{Json, extract::State, http::StatusCode};

pub async fn list_addresses(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> DeliveryResult<Json<Vec<Address>>> {
    Ok(Json(state.gateway.list_addresses().await?))
}

pub async fn get_address(
    State(state): State<AppState>,
    _caller: CurrentUser,
    IdPath(id): IdPath,
) -> DeliveryResult<Json<Address>> {
    state
        .gateway
        .get_address(id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFoundError::new(EntityKind::Address, id).into())
}

pub async fn create_address(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Validated(input): Validated<NewAddress>,
) -> DeliveryResult<(StatusCode, Json<Address>)> {
    let address = state.gateway.create_address(input).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(
    State(state): State<AppState>,
    _caller: CurrentUser,
    IdPath(id): IdPath,
    Validated(changes): Validated<AddressChanges>,
) -> DeliveryResult<Json<Address>> {
    Ok(Json(state.gateway.update_address(id, changes).await?))
}

pub async fn delete_address(
    State(state): State<AppState>,
    _caller: CurrentUser,
    IdPath(id): IdPath,
) -> DeliveryResult<StatusCode> {
    state.gateway.delete_address(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
