//! Item HTTP handlers

use crate::core::auth::AdminUser;
use crate::core::entity::{EntityKind, Item, ItemChanges, NewItem};
use crate::core::error::{DeliveryError, DeliveryResult, NotFoundError, ValidationError};
use crate::core::extractors::IdPath;
use crate::core::validation::Validated;
use crate::server::AppState;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::{Json, extract::State, http::StatusCode};

/// Multipart field carrying the image file
pub const IMAGE_FIELD: &str = "image";

pub async fn list_items(State(state): State<AppState>) -> DeliveryResult<Json<Vec<Item>>> {
    Ok(Json(state.gateway.list_items().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> DeliveryResult<Json<Item>> {
    state
        .gateway
        .get_item(id)
        .await?
        .map(Json)
        .ok_or_else(|| NotFoundError::new(EntityKind::Item, id).into())
}

pub async fn create_item(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Validated(input): Validated<NewItem>,
) -> DeliveryResult<(StatusCode, Json<Item>)> {
    let item = state.gateway.create_item(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
    Validated(changes): Validated<ItemChanges>,
) -> DeliveryResult<Json<Item>> {
    Ok(Json(state.gateway.update_item(id, changes).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
) -> DeliveryResult<StatusCode> {
    state.gateway.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn invalid_upload(message: impl Into<String>) -> DeliveryError {
    ValidationError::InvalidUpload {
        message: message.into(),
    }
    .into()
}

/// Store the `image` file of a multipart body and record it on the item
pub async fn upload_item_image(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    IdPath(id): IdPath,
    multipart: Result<Multipart, MultipartRejection>,
) -> DeliveryResult<Json<Item>> {
    let mut multipart = multipart.map_err(|e| invalid_upload(e.body_text()))?;
    if state.gateway.get_item(id).await?.is_none() {
        return Err(NotFoundError::new(EntityKind::Item, id).into());
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid_upload(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| invalid_upload(e.body_text()))?;
        let reference = state.images.save(&file_name, &bytes).await?;
        let item = state.gateway.set_item_image(id, reference).await?;
        tracing::info!(item_id = %id, image = ?item.image, "item image stored");
        return Ok(Json(item));
    }

    Err(invalid_upload(format!("missing '{}' file field", IMAGE_FIELD)))
}
