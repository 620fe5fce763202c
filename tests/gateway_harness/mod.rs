//! Shared test harness for gateway backends
//!
//! Fixture builders for every delivery record plus the `gateway_tests!`
//! conformance suite.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod gateway_harness;
//! use gateway_harness::*;
//!
//! gateway_tests!(InMemoryGateway::new());
//! ```

#![allow(dead_code)]

#[macro_use]
mod gateway_tests;

use bigdecimal::BigDecimal;
use delivery::core::entity::{
    Category, Item, NewAddress, NewCategory, NewItem, NewOrder, NewOrderLine, NewUser, Order,
    OrderStatus, PaymentMethod, Role, User,
};
use delivery::core::error::DeliveryError;
use delivery::core::service::{CategoryService, Gateway, ItemService, OrderService, UserService};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn new_address(street: &str) -> NewAddress {
    NewAddress {
        street: street.to_string(),
        number: "100".to_string(),
        district: "Centro".to_string(),
        city: "Curitiba".to_string(),
        state: "PR".to_string(),
        zip_code: "80010000".to_string(),
    }
}

/// A user with an already hashed (fake) password
pub fn new_user(name: &str, email: &str, role: Role) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        phone: "41987654321".to_string(),
        role,
        password_hash: "$2b$04$fixturehashfixturehashfixturehashfixturehashfix".to_string(),
        address: new_address(&format!("Rua {}", name)),
    }
}

pub fn price(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub async fn seed_category(gateway: &dyn Gateway, description: &str) -> Category {
    gateway
        .create_category(NewCategory {
            description: description.to_string(),
        })
        .await
        .unwrap()
}

pub async fn seed_item(
    gateway: &dyn Gateway,
    category: &Category,
    description: &str,
    unit_price: &str,
) -> Item {
    gateway
        .create_item(NewItem {
            description: description.to_string(),
            unit_price: price(unit_price),
            category_id: category.id,
        })
        .await
        .unwrap()
}

pub async fn seed_user(gateway: &dyn Gateway, name: &str, role: Role) -> User {
    let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
    gateway
        .create_user_with_address(new_user(name, &email, role))
        .await
        .unwrap()
}

/// A PENDING order by `client` for itself
pub fn new_order(client: &User, lines: &[(&Item, i32)]) -> NewOrder {
    NewOrder {
        payment_method: PaymentMethod::Pix,
        status: OrderStatus::Pending,
        client_id: client.id,
        created_by_id: client.id,
        lines: lines
            .iter()
            .map(|(item, quantity)| NewOrderLine {
                item_id: item.id,
                quantity: *quantity,
            })
            .collect(),
    }
}

pub async fn seed_order(gateway: &dyn Gateway, client: &User, lines: &[(&Item, i32)]) -> Order {
    gateway
        .create_order_with_lines(new_order(client, lines))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Assertions
// ---------------------------------------------------------------------------

/// Assert the error maps to the given machine-readable code
pub fn assert_code<T: std::fmt::Debug>(result: Result<T, DeliveryError>, code: &str) {
    match result {
        Err(err) => assert_eq!(err.error_code(), code, "unexpected error: {}", err),
        Ok(value) => panic!("expected {} error, got Ok({:?})", code, value),
    }
}
