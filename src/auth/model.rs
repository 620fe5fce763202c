//! Login payloads

use crate::core::entity::{Role, UserCredentials};
use crate::core::id::EntityId;
use crate::core::validation::{
    EntityValidationConfig, Operation, ValidatableEntity, filters, validators,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ValidatableEntity for LoginRequest {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        let mut config = EntityValidationConfig::new("login");
        config
            .require("email")
            .add_filter("email", filters::trim())
            .add_filter("email", filters::lowercase())
            .add_validator("email", validators::string())
            .add_validator("email", validators::message("Invalid email", validators::email()));
        config
            .require("password")
            .add_validator("password", validators::string())
            .add_validator(
                "password",
                validators::message(
                    "Password must have at least 6 characters",
                    validators::string_length(6, 128),
                ),
            );
        config
    }
}

/// The public part of the user who logged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginUser {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
}

impl From<UserCredentials> for LoginUser {
    fn from(credentials: UserCredentials) -> Self {
        Self {
            id: credentials.id,
            name: credentials.name,
            email: credentials.email,
            role: credentials.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: LoginUser,
}
