//! Validation and filtering system
//!
//! Each write payload declares its rules as an [`EntityValidationConfig`]:
//! filters normalize values (trim, case, digits-only, numeric coercion),
//! validators check them. Rejections carry the first failing rule's message
//! plus every violation found.

pub mod config;
pub mod extractor;
pub mod filters;
pub mod validators;

pub use config::{EntityValidationConfig, Operation};
pub use extractor::{ValidatableEntity, Validated};
