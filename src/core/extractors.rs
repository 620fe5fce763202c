//! Request extractors shared by the entity handlers

use crate::core::error::{DeliveryError, ValidationError};
use crate::core::id::EntityId;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

/// The `{id}` segment of an entity route, parsed as an [`EntityId`]
///
/// A segment that is not a non-negative integer is a validation error, so
/// `/orders/abc` answers 400 with the usual error body instead of axum's
/// plain-text path rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub EntityId);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = DeliveryError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ValidationError::InvalidId {
                value: e.body_text(),
            })?;
        raw.parse::<EntityId>()
            .map(IdPath)
            .map_err(|_| ValidationError::InvalidId { value: raw }.into())
    }
}
