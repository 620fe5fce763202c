//! Order HTTP handlers
//!
//! Every route requires a token. Clients see and change only orders they
//! take part in; admins see all of them.

use crate::core::auth::CurrentUser;
use crate::core::entity::{EntityKind, Order, OrderChanges, OrderDraft, OrderFilter};
use crate::core::error::{DeliveryResult, NotFoundError};
use crate::core::extractors::IdPath;
use crate::core::id::EntityId;
use crate::core::validation::Validated;
use crate::core::workflow::{order_access_policy, order_total, prepare_new_order};
use crate::server::AppState;
use axum::{Json, extract::State, http::StatusCode};

/// Load an order the caller is allowed to act on
async fn accessible_order(
    state: &AppState,
    caller: &CurrentUser,
    id: EntityId,
) -> DeliveryResult<Order> {
    let order = state
        .gateway
        .get_order(id)
        .await?
        .ok_or_else(|| NotFoundError::new(EntityKind::Order, id))?;
    order_access_policy(&order).enforce(&caller.context())?;
    Ok(order)
}

pub async fn list_orders(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> DeliveryResult<Json<Vec<Order>>> {
    let filter = if caller.is_admin() {
        OrderFilter::all()
    } else {
        OrderFilter::for_client(caller.user_id)
    };
    Ok(Json(state.gateway.list_orders(filter).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    caller: CurrentUser,
    IdPath(id): IdPath,
) -> DeliveryResult<Json<Order>> {
    Ok(Json(accessible_order(&state, &caller, id).await?))
}

/// Place an order and all its lines in one step
pub async fn create_order(
    State(state): State<AppState>,
    caller: CurrentUser,
    Validated(draft): Validated<OrderDraft>,
) -> DeliveryResult<(StatusCode, Json<Order>)> {
    let input = prepare_new_order(draft, &caller)?;
    let order = state.gateway.create_order_with_lines(input).await?;
    tracing::info!(
        order_id = %order.id,
        client_id = %order.client_id,
        lines = order.order_items.len(),
        total = %order_total(&order),
        "order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_order(
    State(state): State<AppState>,
    caller: CurrentUser,
    IdPath(id): IdPath,
    Validated(changes): Validated<OrderChanges>,
) -> DeliveryResult<Json<Order>> {
    accessible_order(&state, &caller, id).await?;
    let order = state.gateway.update_order(id, changes).await?;
    Ok(Json(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    caller: CurrentUser,
    IdPath(id): IdPath,
) -> DeliveryResult<StatusCode> {
    accessible_order(&state, &caller, id).await?;
    state.gateway.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
