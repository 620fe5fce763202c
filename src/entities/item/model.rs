//! Item payload rules

use crate::core::entity::{ItemChanges, NewItem};
use crate::core::validation::{
    EntityValidationConfig, Operation, ValidatableEntity, filters, validators,
};

/// Smallest accepted unit price
pub const MIN_UNIT_PRICE: &str = "0.01";

/// Unit prices fit `NUMERIC(10, 2)`: 8 digits before the point, 2 after
pub const PRICE_INTEGER_DIGITS: usize = 8;
pub const PRICE_FRACTION_DIGITS: usize = 2;

fn item_validation(operation: Operation) -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("item");
    for field in ["description", "unitPrice", "categoryId"] {
        match operation {
            Operation::Create => config.require(field),
            Operation::Update => config.optional(field),
        };
    }

    config
        .add_filter("description", filters::trim())
        .add_validator("description", validators::string())
        .add_validator("description", validators::string_length(3, 100));

    config
        .add_filter("unitPrice", filters::coerce_decimal())
        .add_validator("unitPrice", validators::decimal())
        .add_validator(
            "unitPrice",
            validators::message(
                "Price must be at most 99999999.99 with up to 2 decimal places",
                validators::fixed_point(PRICE_INTEGER_DIGITS, PRICE_FRACTION_DIGITS),
            ),
        )
        .add_validator(
            "unitPrice",
            validators::message(
                "Price must be at least 0.01",
                validators::decimal_min(MIN_UNIT_PRICE),
            ),
        );

    config
        .add_filter("categoryId", filters::coerce_id())
        .add_validator(
            "categoryId",
            validators::message("Invalid category", validators::entity_id()),
        );

    config
}

impl ValidatableEntity for NewItem {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        item_validation(Operation::Create)
    }
}

impl ValidatableEntity for ItemChanges {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        item_validation(Operation::Update)
    }
}
