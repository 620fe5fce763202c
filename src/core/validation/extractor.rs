//! Axum extractor for validated payloads
//!
//! This module provides the `Validated<T>` extractor that filters and
//! validates request bodies before they reach handlers, then hands the
//! handler a typed write record.

use super::config::{EntityValidationConfig, Operation};
use crate::core::error::{DeliveryError, DeliveryResult, ValidationError};
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Trait for payloads that carry declarative validation rules
pub trait ValidatableEntity: DeserializeOwned {
    /// Get the validation configuration for a specific operation
    fn validation_config(operation: Operation) -> EntityValidationConfig;

    /// Filter, validate and deserialize a raw payload
    fn from_payload(operation: Operation, payload: Value) -> DeliveryResult<Self> {
        let normalized = Self::validation_config(operation)
            .validate_and_filter(payload)
            .map_err(ValidationError::from_violations)?;
        serde_json::from_value(normalized).map_err(DeliveryError::from)
    }
}

/// Axum extractor that validates and filters a JSON body into `T`
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn create_category(
///     State(state): State<AppState>,
///     Validated(input): Validated<NewCategory>,
/// ) -> DeliveryResult<Json<Category>> {
///     // input is already trimmed and checked
/// }
/// ```
pub struct Validated<T>(pub T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: ValidatableEntity + Send,
{
    type Rejection = DeliveryError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let operation = Operation::from_method(req.method());

        let Json(payload): Json<Value> = Json::from_request(req, state).await.map_err(|e| {
            DeliveryError::Validation(ValidationError::InvalidJson {
                message: e.body_text(),
            })
        })?;

        T::from_payload(operation, payload).map(Validated)
    }
}
