//! User payloads and their rules
//!
//! Payloads carry the plain password; handlers hash it before anything
//! reaches the gateway.

use crate::core::entity::{NewAddress, Role};
use crate::core::id::EntityId;
use crate::core::validation::{
    EntityValidationConfig, Operation, ValidatableEntity, filters, validators,
};
use crate::entities::address::address_validation;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// Registration payload: the user and the address they live at
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub address: NewAddress,
}

/// Partial update of a user; the address itself is not editable here
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<Role>,
    pub address_id: Option<EntityId>,
}

impl fmt::Debug for RegisterUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for UpdateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("address_id", &self.address_id)
            .finish_non_exhaustive()
    }
}

fn user_validation(operation: Operation) -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("user");
    for field in ["name", "email", "phone", "password"] {
        match operation {
            Operation::Create => config.require(field),
            Operation::Update => config.optional(field),
        };
    }

    config
        .add_filter("name", filters::trim())
        .add_validator("name", validators::string())
        .add_validator(
            "name",
            validators::message(
                "Name must have at least 3 characters",
                validators::string_length(3, 100),
            ),
        )
        .add_validator(
            "name",
            validators::message(
                "Name must not repeat a character 3 times in a row",
                validators::no_triple_repeat(),
            ),
        );

    config
        .add_filter("email", filters::trim())
        .add_filter("email", filters::lowercase())
        .add_validator("email", validators::string())
        .add_validator("email", validators::message("Invalid email", validators::email()));

    config
        .add_filter("phone", filters::digits_only())
        .add_validator("phone", validators::string())
        .add_validator(
            "phone",
            validators::message(
                "Phone must have area code and number (10 or 11 digits)",
                validators::digit_count(10, 11),
            ),
        );

    config
        .add_validator("password", validators::string())
        .add_validator(
            "password",
            validators::message(
                "Password must have at least 6 characters",
                validators::string_length(6, 128),
            ),
        )
        .add_validator(
            "password",
            validators::message(
                "Password must contain at least one digit",
                validators::contains_digit(),
            ),
        );

    config.optional("type").add_validator(
        "type",
        validators::message("Type must be CLIENT or ADMIN", validators::in_list(Role::ALL)),
    );

    match operation {
        Operation::Create => {
            config
                .default_value("type", json!(Role::Client.as_str()))
                .require("address")
                .nested("address", address_validation(Operation::Create));
        }
        Operation::Update => {
            config
                .optional("addressId")
                .add_filter("addressId", filters::coerce_id())
                .add_validator("addressId", validators::entity_id());
        }
    }
    config
}

impl ValidatableEntity for RegisterUser {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        user_validation(Operation::Create)
    }
}

impl ValidatableEntity for UpdateUser {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        user_validation(Operation::Update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DeliveryError;
    use serde_json::Value;

    fn registration() -> Value {
        json!({
            "name": "  Ana Souza ",
            "email": "  Ana@Example.COM ",
            "phone": "(11) 98765-4321",
            "password": "secret1",
            "address": {
                "street": "Rua A",
                "number": "10",
                "district": "Centro",
                "city": "Recife",
                "state": "pe",
                "zipCode": "50000-000"
            }
        })
    }

    fn violations(payload: Value) -> Vec<(String, String)> {
        match RegisterUser::from_payload(Operation::Create, payload) {
            Err(DeliveryError::Validation(err)) => err
                .violations()
                .iter()
                .map(|v| (v.field.clone(), v.message.clone()))
                .collect(),
            other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_normalizes_registration() {
        let user = RegisterUser::from_payload(Operation::Create, registration()).unwrap();
        assert_eq!(user.name, "Ana Souza");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.phone, "11987654321");
        assert_eq!(user.role, Role::Client);
        assert_eq!(user.address.state, "PE");
        assert_eq!(user.address.zip_code, "50000000");
    }

    #[test]
    fn test_triple_repeat_is_case_insensitive() {
        let mut payload = registration();
        payload["name"] = json!("Aaab Silva");
        assert_eq!(
            violations(payload),
            vec![(
                "name".to_string(),
                "Name must not repeat a character 3 times in a row".to_string()
            )]
        );
    }

    #[test]
    fn test_password_never_echoed() {
        let mut payload = registration();
        payload["password"] = json!("abcdefgh");
        let found = violations(payload);
        assert_eq!(found[0].0, "password");
        assert!(!found[0].1.contains("abcdefgh"));
    }

    #[test]
    fn test_nested_address_paths() {
        let mut payload = registration();
        payload["address"]["zipCode"] = json!("123");
        payload["phone"] = json!("12345");
        let fields: Vec<String> = violations(payload).into_iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["phone", "address.zipCode"]);
    }

    #[test]
    fn test_address_is_required_on_registration() {
        let mut payload = registration();
        payload.as_object_mut().unwrap().remove("address");
        assert_eq!(violations(payload)[0].0, "address");
    }

    #[test]
    fn test_update_ignores_address_and_accepts_address_id() {
        let update = UpdateUser::from_payload(
            Operation::Update,
            json!({ "addressId": 12, "address": { "city": "X" }, "type": "ADMIN" }),
        )
        .unwrap();
        assert_eq!(update.address_id, Some(EntityId::new(12)));
        assert_eq!(update.role, Some(Role::Admin));
        assert!(update.password.is_none());
    }
}
