//! Domain records of the delivery backend
//!
//! Read-side records (`Category`, `Address`, `User`, `Item`, `Order`,
//! `OrderLine`) are what the gateway returns and what goes on the wire.
//! Related entities are embedded through fixed projections (`UserRef`,
//! `ClientRef`) so a read never leaks more of the related row than needed.
//! Write-side records (`New*`, `*Changes`) are only produced by the
//! validation layer and consumed by the gateway.

use crate::core::id::EntityId;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a closed set of wire constants serialized as SCREAMING_CASE strings
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident => $wire:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// All accepted wire values, in declaration order
            pub const ALL: &'static [&'static str] = &[$( $wire ),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(format!(
                        "'{}' is not one of {}",
                        other,
                        Self::ALL.join(", ")
                    )),
                }
            }
        }
    };
}

wire_enum! {
    /// Account type; carried in the identity token
    Role { Client => "CLIENT", Admin => "ADMIN" }
}

impl Default for Role {
    fn default() -> Self {
        Role::Client
    }
}

wire_enum! {
    PaymentMethod { Cash => "CASH", Debit => "DEBIT", Credit => "CREDIT", Pix => "PIX" }
}

wire_enum! {
    /// Order lifecycle state; see `core::workflow` for the allowed transitions
    OrderStatus { Pending => "PENDING", Completed => "COMPLETED", Cancelled => "CANCELLED" }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// Entity types, used to label errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    Address,
    User,
    Item,
    Order,
    OrderLine,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Address => "address",
            EntityKind::User => "user",
            EntityKind::Item => "item",
            EntityKind::Order => "order",
            EntityKind::OrderLine => "order line",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Projections
// =============================================================================

/// A related user exposed as id and name only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: EntityId,
    pub name: String,
}

/// The client of an order: id, name and phone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: EntityId,
    pub name: String,
    pub phone: String,
}

// =============================================================================
// Read-side records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: EntityId,
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// The user living at this address, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

/// Public view of a user; the password hash never leaves the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub address_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// What login needs to check a password; not serializable
#[derive(Clone)]
pub struct UserCredentials {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: EntityId,
    pub description: String,
    pub unit_price: BigDecimal,
    pub category_id: EntityId,
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: EntityId,
    pub order_id: EntityId,
    pub item_id: EntityId,
    pub quantity: i32,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: EntityId,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub client_id: EntityId,
    pub created_by_id: EntityId,
    pub created_at: DateTime<Utc>,
    pub client: ClientRef,
    pub created_by: UserRef,
    pub order_items: Vec<OrderLine>,
}

// =============================================================================
// Write-side records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCategory {
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryChanges {
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressChanges {
    pub street: Option<String>,
    pub number: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// A user ready to be stored together with its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub password_hash: String,
    pub address: NewAddress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
    pub address_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub description: String,
    pub unit_price: BigDecimal,
    pub category_id: EntityId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    pub description: Option<String>,
    pub unit_price: Option<BigDecimal>,
    pub category_id: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderLine {
    pub item_id: EntityId,
    pub quantity: i32,
}

/// An order as submitted: who it is for and who placed it may be left out
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub payment_method: PaymentMethod,
    pub status: Option<OrderStatus>,
    pub client_id: Option<EntityId>,
    pub created_by_id: Option<EntityId>,
    pub items: Vec<NewOrderLine>,
}

/// An order with every default resolved, ready for the atomic insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub client_id: EntityId,
    pub created_by_id: EntityId,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderChanges {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
}

/// Restricts an order listing to one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub client_id: Option<EntityId>,
}

impl OrderFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_client(client_id: EntityId) -> Self {
        Self {
            client_id: Some(client_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_wire_enums_use_screaming_case() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("ADMIN"));
        assert_eq!(
            serde_json::to_value(PaymentMethod::Pix).unwrap(),
            json!("PIX")
        );
        assert_eq!(OrderStatus::from_str("CANCELLED"), Ok(OrderStatus::Cancelled));
        assert!(OrderStatus::from_str("pending").is_err());
    }

    #[test]
    fn test_user_serializes_role_as_type_and_no_password() {
        let user = User {
            id: EntityId::new(7),
            name: "Ana Souza".into(),
            email: "ana@example.com".into(),
            phone: "11987654321".into(),
            role: Role::Client,
            address_id: EntityId::new(3),
            address: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["type"], "CLIENT");
        assert_eq!(value["id"], "7");
        assert_eq!(value["addressId"], "3");
        assert!(value.get("password").is_none());
        assert!(value.get("address").is_none());
    }

    #[test]
    fn test_item_price_is_exact_decimal_string() {
        let item = Item {
            id: EntityId::new(1),
            description: "Pizza".into(),
            unit_price: BigDecimal::from_str("25.50").unwrap(),
            category_id: EntityId::new(2),
            image: None,
            category: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["unitPrice"], "25.50");
        assert_eq!(value["categoryId"], "2");
        assert!(value["image"].is_null());
    }

    #[test]
    fn test_credentials_debug_redacts_hash() {
        let creds = UserCredentials {
            id: EntityId::new(1),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: Role::Client,
            password_hash: "$2b$10$secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
