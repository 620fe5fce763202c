//! Category payload rules

use crate::core::entity::{CategoryChanges, NewCategory};
use crate::core::validation::{
    EntityValidationConfig, Operation, ValidatableEntity, filters, validators,
};

pub fn category_validation(operation: Operation) -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("category");
    match operation {
        Operation::Create => config.require("description"),
        Operation::Update => config.optional("description"),
    };
    config
        .add_filter("description", filters::trim())
        .add_validator("description", validators::string())
        .add_validator("description", validators::string_length(3, 50));
    config
}

impl ValidatableEntity for NewCategory {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        category_validation(Operation::Create)
    }
}

impl ValidatableEntity for CategoryChanges {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        category_validation(Operation::Update)
    }
}
