//! Order payload rules

use crate::core::entity::{OrderChanges, OrderDraft, OrderStatus, PaymentMethod};
use crate::core::validation::{
    EntityValidationConfig, Operation, ValidatableEntity, filters, validators,
};
use crate::core::workflow::{MAX_LINE_QUANTITY, MAX_ORDER_LINES, MIN_LINE_QUANTITY};

fn line_validation() -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("order line");
    config
        .require("itemId")
        .add_filter("itemId", filters::coerce_id())
        .add_validator(
            "itemId",
            validators::message("Invalid item id", validators::entity_id()),
        );
    config
        .require("quantity")
        .add_filter("quantity", filters::coerce_integer())
        .add_validator(
            "quantity",
            validators::message("Quantity must be a whole number", validators::integer()),
        )
        .add_validator(
            "quantity",
            validators::message(
                "Quantity must be at least 1",
                validators::min_value(f64::from(MIN_LINE_QUANTITY)),
            ),
        )
        .add_validator(
            "quantity",
            validators::message(
                "Quantity per item is at most 100",
                validators::max_value(f64::from(MAX_LINE_QUANTITY)),
            ),
        );
    config
}

fn order_draft_validation() -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("order");
    config.require("paymentMethod").add_validator(
        "paymentMethod",
        validators::message("Invalid payment method", validators::in_list(PaymentMethod::ALL)),
    );
    config
        .optional("status")
        .add_filter("status", filters::trim())
        .add_filter("status", filters::uppercase())
        .add_validator(
            "status",
            validators::message("Invalid order status", validators::in_list(OrderStatus::ALL)),
        );
    for field in ["clientId", "createdById"] {
        config
            .optional(field)
            .add_filter(field, filters::coerce_id())
            .add_validator(field, validators::entity_id());
    }
    config
        .require("items")
        .add_validator("items", validators::array_length(1, MAX_ORDER_LINES))
        .each("items", line_validation());
    config
}

fn order_changes_validation() -> EntityValidationConfig {
    let mut config = EntityValidationConfig::new("order");
    config.optional("status").add_validator(
        "status",
        validators::message("Invalid order status", validators::in_list(OrderStatus::ALL)),
    );
    config.optional("paymentMethod").add_validator(
        "paymentMethod",
        validators::message("Invalid payment method", validators::in_list(PaymentMethod::ALL)),
    );
    config.require_one_of(
        &["status", "paymentMethod"],
        "Provide a status or a payment method to change",
    );
    config
}

impl ValidatableEntity for OrderDraft {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        order_draft_validation()
    }
}

impl ValidatableEntity for OrderChanges {
    fn validation_config(_: Operation) -> EntityValidationConfig {
        order_changes_validation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::NewOrderLine;
    use crate::core::error::DeliveryError;
    use crate::core::id::EntityId;
    use serde_json::{Value, json};

    fn fields(payload: Value) -> Vec<String> {
        match OrderDraft::from_payload(Operation::Create, payload) {
            Err(DeliveryError::Validation(err)) => {
                err.violations().iter().map(|v| v.field.clone()).collect()
            }
            other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_lines_are_coerced_from_strings() {
        let draft = OrderDraft::from_payload(
            Operation::Create,
            json!({
                "paymentMethod": "PIX",
                "items": [{ "itemId": "1", "quantity": "2" }, { "itemId": 2, "quantity": 1 }]
            }),
        )
        .unwrap();
        assert_eq!(draft.payment_method, PaymentMethod::Pix);
        assert_eq!(draft.status, None);
        assert_eq!(
            draft.items,
            vec![
                NewOrderLine { item_id: EntityId::new(1), quantity: 2 },
                NewOrderLine { item_id: EntityId::new(2), quantity: 1 },
            ]
        );
    }

    #[test]
    fn test_line_count_bounds() {
        assert_eq!(
            fields(json!({ "paymentMethod": "CASH", "items": [] })),
            vec!["items"]
        );
        let lines: Vec<Value> = (1..=51)
            .map(|i| json!({ "itemId": i, "quantity": 1 }))
            .collect();
        assert_eq!(
            fields(json!({ "paymentMethod": "CASH", "items": lines })),
            vec!["items"]
        );
    }

    #[test]
    fn test_bad_lines_report_their_index() {
        let found = fields(json!({
            "paymentMethod": "BITCOIN",
            "items": [{ "itemId": 1, "quantity": 1 }, { "itemId": 2, "quantity": 101 }]
        }));
        assert_eq!(found, vec!["paymentMethod", "items[1].quantity"]);
    }

    #[test]
    fn test_fractional_quantity_is_rejected() {
        let found = fields(json!({
            "paymentMethod": "CASH",
            "items": [{ "itemId": 1, "quantity": 1.5 }]
        }));
        assert_eq!(found, vec!["items[0].quantity"]);
    }

    #[test]
    fn test_changes_need_one_field_and_drop_the_rest() {
        assert!(OrderChanges::from_payload(Operation::Update, json!({ "clientId": "9" })).is_err());
        let changes = OrderChanges::from_payload(
            Operation::Update,
            json!({ "status": "CANCELLED", "clientId": "9" }),
        )
        .unwrap();
        assert_eq!(changes.status, Some(OrderStatus::Cancelled));
        assert_eq!(changes.payment_method, None);
    }
}
