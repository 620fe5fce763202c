//! Typed error handling for the delivery backend
//!
//! Every failure a request can hit is one variant of [`DeliveryError`]. Each
//! variant wraps a category-specific error carrying exactly the data the
//! client needs, and the whole tree maps to an HTTP status plus a stable
//! machine-readable code at the request boundary.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: malformed or out-of-range input (never reaches storage)
//! - [`AuthenticationError`]: missing, expired or invalid bearer token, bad login
//! - [`AuthorizationError`]: valid identity, insufficient rights
//! - [`NotFoundError`]: the targeted row does not exist
//! - [`ConflictError`]: uniqueness violation, blocked delete, illegal transition
//! - [`ReferenceError`]: a related id in the payload does not resolve
//! - [`InternalError`]: everything else
//!
//! # Example
//!
//! ```rust,ignore
//! use delivery::prelude::*;
//!
//! let category = gateway
//!     .get_category(id)
//!     .await?
//!     .ok_or(NotFoundError::new(EntityKind::Category, id))?;
//! ```

use crate::core::entity::{EntityKind, OrderStatus};
use crate::core::id::EntityId;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type of the delivery backend
#[derive(Debug)]
pub enum DeliveryError {
    Validation(ValidationError),
    Authentication(AuthenticationError),
    Authorization(AuthorizationError),
    NotFound(NotFoundError),
    Conflict(ConflictError),
    Reference(ReferenceError),
    Internal(InternalError),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Validation(e) => write!(f, "{}", e),
            DeliveryError::Authentication(e) => write!(f, "{}", e),
            DeliveryError::Authorization(e) => write!(f, "{}", e),
            DeliveryError::NotFound(e) => write!(f, "{}", e),
            DeliveryError::Conflict(e) => write!(f, "{}", e),
            DeliveryError::Reference(e) => write!(f, "{}", e),
            DeliveryError::Internal(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Validation(e) => Some(e),
            DeliveryError::Authentication(e) => Some(e),
            DeliveryError::Authorization(e) => Some(e),
            DeliveryError::NotFound(e) => Some(e),
            DeliveryError::Conflict(e) => Some(e),
            DeliveryError::Reference(e) => Some(e),
            DeliveryError::Internal(e) => Some(e),
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DeliveryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeliveryError::Validation(_) => StatusCode::BAD_REQUEST,
            DeliveryError::Authentication(e) => e.status_code(),
            DeliveryError::Authorization(_) => StatusCode::FORBIDDEN,
            DeliveryError::NotFound(_) => StatusCode::NOT_FOUND,
            DeliveryError::Conflict(_) => StatusCode::CONFLICT,
            DeliveryError::Reference(_) => StatusCode::CONFLICT,
            DeliveryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DeliveryError::Validation(e) => e.error_code(),
            DeliveryError::Authentication(e) => e.error_code(),
            DeliveryError::Authorization(e) => e.error_code(),
            DeliveryError::NotFound(_) => "NOT_FOUND",
            DeliveryError::Conflict(e) => e.error_code(),
            DeliveryError::Reference(_) => "REFERENCE_NOT_FOUND",
            DeliveryError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    ///
    /// Internal errors never leak their cause to the client.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            DeliveryError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DeliveryError::Validation(ValidationError::Rejected { violations, .. }) => {
                Some(serde_json::json!(violations))
            }
            DeliveryError::NotFound(NotFoundError { entity, id }) => Some(serde_json::json!({
                "entity": entity.as_str(),
                "id": id,
            })),
            DeliveryError::Reference(ReferenceError { field, entity, id }) => {
                Some(serde_json::json!({
                    "field": field,
                    "entity": entity.as_str(),
                    "id": id,
                }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for DeliveryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            DeliveryError::Internal(e) => tracing::error!(error = %e, "request failed"),
            DeliveryError::Authentication(e) => tracing::warn!(error = %e, "authentication failed"),
            _ => tracing::debug!(code = self.error_code(), "request rejected"),
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// One rule violation on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Dotted path of the offending field (`address.zipCode`, `items[2].quantity`)
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// One or more field rules failed; `message` is the first violation
    #[error("{message}")]
    Rejected {
        message: String,
        violations: Vec<FieldViolation>,
    },

    #[error("Invalid JSON body: {message}")]
    InvalidJson { message: String },

    #[error("Invalid id '{value}'")]
    InvalidId { value: String },

    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },
}

impl ValidationError {
    /// Build a rejection from a non-empty violation list
    pub fn from_violations(violations: Vec<FieldViolation>) -> Self {
        let message = violations
            .first()
            .map(|v| v.message.clone())
            .unwrap_or_else(|| "Validation failed".to_string());
        ValidationError::Rejected {
            message,
            violations,
        }
    }

    /// Rejection of a single field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from_violations(vec![FieldViolation::new(field, message)])
    }

    /// Every failed field rule; empty for errors not tied to a field
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ValidationError::Rejected { violations, .. } => violations,
            _ => &[],
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Rejected { .. } => "VALIDATION_ERROR",
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
            ValidationError::InvalidId { .. } => "INVALID_ID",
            ValidationError::InvalidUpload { .. } => "INVALID_UPLOAD",
        }
    }
}

impl From<ValidationError> for DeliveryError {
    fn from(err: ValidationError) -> Self {
        DeliveryError::Validation(err)
    }
}

// =============================================================================
// Authentication Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Authentication token is missing")]
    MissingToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid token")]
    InvalidToken,

    /// Unknown email and wrong password share this variant
    #[error("Incorrect email or password")]
    InvalidCredentials,
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthenticationError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthenticationError::InvalidToken => StatusCode::FORBIDDEN,
            AuthenticationError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthenticationError::MissingToken => "TOKEN_MISSING",
            AuthenticationError::ExpiredToken => "TOKEN_EXPIRED",
            AuthenticationError::InvalidToken => "TOKEN_INVALID",
            AuthenticationError::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }
}

impl From<AuthenticationError> for DeliveryError {
    fn from(err: AuthenticationError) -> Self {
        DeliveryError::Authentication(err)
    }
}

// =============================================================================
// Authorization Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Access denied: administrator role required")]
    AdminRequired,

    #[error("Access denied: {entity} '{id}' belongs to another user")]
    NotOwner { entity: EntityKind, id: EntityId },

    #[error("Access denied: {action}")]
    Forbidden { action: String },
}

impl AuthorizationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthorizationError::AdminRequired => "ADMIN_REQUIRED",
            AuthorizationError::NotOwner { .. } => "NOT_OWNER",
            AuthorizationError::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

impl From<AuthorizationError> for DeliveryError {
    fn from(err: AuthorizationError) -> Self {
        DeliveryError::Authorization(err)
    }
}

// =============================================================================
// Not Found / Reference
// =============================================================================

/// The row an update, delete or read targets does not exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} with id '{id}' not found")]
pub struct NotFoundError {
    pub entity: EntityKind,
    pub id: EntityId,
}

impl NotFoundError {
    pub fn new(entity: EntityKind, id: EntityId) -> Self {
        Self { entity, id }
    }
}

impl From<NotFoundError> for DeliveryError {
    fn from(err: NotFoundError) -> Self {
        DeliveryError::NotFound(err)
    }
}

/// A related id carried by the payload does not resolve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Referenced {entity} '{id}' in field '{field}' does not exist")]
pub struct ReferenceError {
    pub field: String,
    pub entity: EntityKind,
    pub id: EntityId,
}

impl ReferenceError {
    pub fn new(field: impl Into<String>, entity: EntityKind, id: EntityId) -> Self {
        Self {
            field: field.into(),
            entity,
            id,
        }
    }
}

impl From<ReferenceError> for DeliveryError {
    fn from(err: ReferenceError) -> Self {
        DeliveryError::Reference(err)
    }
}

// =============================================================================
// Conflict Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("Email '{email}' is already registered")]
    DuplicateEmail { email: String },

    #[error("Address '{address_id}' already belongs to another user")]
    AddressInUse { address_id: EntityId },

    #[error("{entity} '{id}' cannot be deleted while {dependents} reference it")]
    HasDependents {
        entity: EntityKind,
        id: EntityId,
        dependents: &'static str,
    },

    #[error("Order status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Payment method cannot change once the order is {status}")]
    PaymentLocked { status: OrderStatus },
}

impl ConflictError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConflictError::DuplicateEmail { .. } => "DUPLICATE_EMAIL",
            ConflictError::AddressInUse { .. } => "ADDRESS_IN_USE",
            ConflictError::HasDependents { .. } => "HAS_DEPENDENTS",
            ConflictError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            ConflictError::PaymentLocked { .. } => "PAYMENT_LOCKED",
        }
    }
}

impl From<ConflictError> for DeliveryError {
    fn from(err: ConflictError) -> Self {
        DeliveryError::Conflict(err)
    }
}

// =============================================================================
// Internal Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Token(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

impl From<InternalError> for DeliveryError {
    fn from(err: InternalError) -> Self {
        DeliveryError::Internal(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        DeliveryError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(err: std::io::Error) -> Self {
        DeliveryError::Internal(InternalError::Io(err))
    }
}

impl From<tokio::task::JoinError> for DeliveryError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeliveryError::Internal(InternalError::Task(err))
    }
}

impl From<bcrypt::BcryptError> for DeliveryError {
    fn from(err: bcrypt::BcryptError) -> Self {
        DeliveryError::Internal(InternalError::Hashing(err.to_string()))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DeliveryError {
    fn from(err: sqlx::Error) -> Self {
        DeliveryError::Internal(InternalError::Storage(err.to_string()))
    }
}

impl From<anyhow::Error> for DeliveryError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DeliveryError>() {
            Ok(delivery_err) => delivery_err,
            Err(other) => DeliveryError::Internal(InternalError::Other(other.to_string())),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;
