//! Address payload rules
//!
//! The same rules validate a standalone address and the `address` object
//! nested in a user registration.

use crate::core::entity::{AddressChanges, NewAddress};
use crate::core::validation::{
    EntityValidationConfig, Operation, ValidatableEntity, filters, validators,
};

const TEXT_FIELDS: [&str; 4] = ["street", "number", "district", "city"];

pub fn address_validation(operation: Operation) -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("address");
    for field in TEXT_FIELDS.into_iter().chain(["state", "zipCode"]) {
        match operation {
            Operation::Create => config.require(field),
            Operation::Update => config.optional(field),
        };
    }

    for field in TEXT_FIELDS {
        config
            .add_filter(field, filters::trim())
            .add_validator(field, validators::string())
            .add_validator(field, validators::non_empty());
    }

    config
        .add_filter("state", filters::trim())
        .add_filter("state", filters::uppercase())
        .add_validator("state", validators::string())
        .add_validator("state", validators::exact_length(2));

    config
        .add_filter("zipCode", filters::digits_only())
        .add_validator("zipCode", validators::string())
        .add_validator(
            "zipCode",
            validators::message("Zip code must have 8 digits", validators::digit_count(8, 8)),
        );

    config
}

impl ValidatableEntity for NewAddress {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        address_validation(Operation::Create)
    }
}

impl ValidatableEntity for AddressChanges {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        address_validation(Operation::Update)
    }
}
