//! Order workflow
//!
//! Orders start PENDING and may move once to COMPLETED or CANCELLED; both
//! are terminal. Re-applying the current status is a no-op. The payment
//! method is frozen once the order leaves PENDING.
//!
//! Creation resolves who the order is for and who placed it from the
//! caller's identity before the gateway performs the atomic insert.

use crate::core::auth::{AuthPolicy, CurrentUser};
use crate::core::entity::{
    EntityKind, NewOrder, Order, OrderChanges, OrderDraft, OrderStatus, PaymentMethod,
};
use crate::core::error::{AuthorizationError, ConflictError, DeliveryResult};
use crate::core::id::EntityId;
use bigdecimal::BigDecimal;

/// Maximum number of lines in one order
pub const MAX_ORDER_LINES: usize = 50;
/// Quantity bounds of one order line
pub const MIN_LINE_QUANTITY: i32 = 1;
pub const MAX_LINE_QUANTITY: i32 = 100;

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    from == to
        || matches!(
            (from, to),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
}

pub fn is_terminal(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Pending)
}

/// Check an update against the order's current state
///
/// Gateways call this with the current row locked, so the check and the
/// write see the same state.
pub fn check_update(
    status: OrderStatus,
    payment_method: PaymentMethod,
    changes: &OrderChanges,
) -> DeliveryResult<()> {
    if let Some(to) = changes.status {
        if !can_transition(status, to) {
            return Err(ConflictError::InvalidStatusTransition { from: status, to }.into());
        }
    }
    if let Some(method) = changes.payment_method {
        if method != payment_method && is_terminal(status) {
            return Err(ConflictError::PaymentLocked { status }.into());
        }
    }
    Ok(())
}

/// Resolve defaults and ownership of a submitted order
///
/// Clients may only place PENDING orders for themselves. Admins may place
/// orders on behalf of any client; both ids default to the caller.
pub fn prepare_new_order(draft: OrderDraft, caller: &CurrentUser) -> DeliveryResult<NewOrder> {
    let client_id = draft.client_id.unwrap_or(caller.user_id);
    let created_by_id = draft.created_by_id.unwrap_or(caller.user_id);
    let status = draft.status.unwrap_or_default();

    if !caller.is_admin() {
        if client_id != caller.user_id {
            return Err(AuthorizationError::Forbidden {
                action: "clients may only place orders for themselves".to_string(),
            }
            .into());
        }
        if created_by_id != caller.user_id {
            return Err(AuthorizationError::Forbidden {
                action: "orders are recorded as placed by the caller".to_string(),
            }
            .into());
        }
        if status != OrderStatus::Pending {
            return Err(AuthorizationError::Forbidden {
                action: "new orders start as PENDING".to_string(),
            }
            .into());
        }
    }

    Ok(NewOrder {
        payment_method: draft.payment_method,
        status,
        client_id,
        created_by_id,
        lines: draft.items,
    })
}

/// Who may read or modify an existing order
pub fn order_access_policy(order: &Order) -> AuthPolicy {
    AuthPolicy::ParticipantOrAdmin {
        entity: EntityKind::Order,
        id: order.id,
        participants: vec![order.client_id, order.created_by_id],
    }
}

/// Sum of unit price times quantity over the order's lines
///
/// Derived at read time from the current item prices; never stored.
pub fn order_total(order: &Order) -> BigDecimal {
    order
        .order_items
        .iter()
        .map(|line| &line.item.unit_price * BigDecimal::from(line.quantity))
        .sum()
}

/// Ids of every item referenced by the draft, deduplicated, in first-seen order
pub fn referenced_items(order: &NewOrder) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = Vec::with_capacity(order.lines.len());
    for line in &order.lines {
        if !ids.contains(&line.item_id) {
            ids.push(line.item_id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::{ClientRef, Item, NewOrderLine, OrderLine, Role, UserRef};
    use crate::core::error::DeliveryError;
    use chrono::Utc;
    use std::str::FromStr;

    fn caller(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            user_id: EntityId::new(id),
            role,
        }
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            payment_method: PaymentMethod::Pix,
            status: None,
            client_id: None,
            created_by_id: None,
            items: vec![NewOrderLine {
                item_id: EntityId::new(1),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn test_forward_only_transitions() {
        use OrderStatus::*;
        assert!(can_transition(Pending, Completed));
        assert!(can_transition(Pending, Cancelled));
        assert!(can_transition(Completed, Completed));
        assert!(!can_transition(Completed, Pending));
        assert!(!can_transition(Cancelled, Completed));
        assert!(!can_transition(Completed, Cancelled));
    }

    #[test]
    fn test_check_update_rejects_reopening() {
        let changes = OrderChanges {
            status: Some(OrderStatus::Pending),
            payment_method: None,
        };
        let err = check_update(OrderStatus::Cancelled, PaymentMethod::Cash, &changes).unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Conflict(ConflictError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_payment_frozen_after_completion() {
        let changes = OrderChanges {
            status: None,
            payment_method: Some(PaymentMethod::Credit),
        };
        assert!(check_update(OrderStatus::Pending, PaymentMethod::Cash, &changes).is_ok());
        assert!(check_update(OrderStatus::Completed, PaymentMethod::Cash, &changes).is_err());
        // same method again is harmless
        assert!(check_update(OrderStatus::Completed, PaymentMethod::Credit, &changes).is_ok());
    }

    #[test]
    fn test_defaults_resolve_to_caller() {
        let order = prepare_new_order(draft(), &caller(7, Role::Client)).unwrap();
        assert_eq!(order.client_id, EntityId::new(7));
        assert_eq!(order.created_by_id, EntityId::new(7));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_client_cannot_order_for_someone_else() {
        let mut d = draft();
        d.client_id = Some(EntityId::new(8));
        let err = prepare_new_order(d, &caller(7, Role::Client)).unwrap_err();
        assert!(matches!(err, DeliveryError::Authorization(_)));
    }

    #[test]
    fn test_admin_places_order_for_client() {
        let mut d = draft();
        d.client_id = Some(EntityId::new(8));
        let order = prepare_new_order(d, &caller(1, Role::Admin)).unwrap();
        assert_eq!(order.client_id, EntityId::new(8));
        assert_eq!(order.created_by_id, EntityId::new(1));
    }

    #[test]
    fn test_order_total() {
        let item = |id: i64, price: &str| Item {
            id: EntityId::new(id),
            description: "x".into(),
            unit_price: BigDecimal::from_str(price).unwrap(),
            category_id: EntityId::new(1),
            image: None,
            category: None,
        };
        let order = Order {
            id: EntityId::new(1),
            payment_method: PaymentMethod::Cash,
            status: OrderStatus::Pending,
            client_id: EntityId::new(2),
            created_by_id: EntityId::new(2),
            created_at: Utc::now(),
            client: ClientRef {
                id: EntityId::new(2),
                name: "Ana".into(),
                phone: "11987654321".into(),
            },
            created_by: UserRef {
                id: EntityId::new(2),
                name: "Ana".into(),
            },
            order_items: vec![
                OrderLine {
                    id: EntityId::new(1),
                    order_id: EntityId::new(1),
                    item_id: EntityId::new(1),
                    quantity: 2,
                    item: item(1, "25.50"),
                },
                OrderLine {
                    id: EntityId::new(2),
                    order_id: EntityId::new(1),
                    item_id: EntityId::new(2),
                    quantity: 3,
                    item: item(2, "0.10"),
                },
            ],
        };
        assert_eq!(order_total(&order), BigDecimal::from_str("51.30").unwrap());
    }
}
