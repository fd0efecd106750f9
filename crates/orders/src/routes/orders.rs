//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use orchard_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, ensure_admin, ensure_resource_owner, ensure_user_exists};
use crate::models::{NewOrder, NewOrderItem, Order, OrderError, OrderRepository};
use crate::state::AppState;

/// Body for `PATCH /orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body for `PATCH /orders/{id}/items`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemsRequest {
    pub items: Vec<NewOrderItem>,
}

/// Create an order.
///
/// The target `user_id` must be the caller (or the caller must be an admin),
/// and must be known to the identity service. Both checks run before any
/// write.
#[instrument(skip(state, auth))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<NewOrder>,
) -> Result<Response> {
    let ctx = auth.0;
    ensure_resource_owner(&state, &ctx, body.user_id).await?;
    ensure_user_exists(&state, &ctx, body.user_id).await?;

    let order = OrderRepository::new(state.orders()).create(body).await?;
    tracing::info!(order_id = %order.id, user_id = %order.user_id, "order created");
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

/// List every order. Admin only.
#[instrument(skip(state, auth))]
pub async fn list_all(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Order>>> {
    ensure_admin(&state, &auth.0).await?;
    let orders = OrderRepository::new(state.orders()).list().await?;
    Ok(Json(orders))
}

/// List the caller's own orders.
#[instrument(skip(state, auth))]
pub async fn list_mine(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.orders())
        .list_for_user(auth.0.identity.subject_id)
        .await?;
    Ok(Json(orders))
}

/// Fetch one order. Owner or admin.
#[instrument(skip(state, auth))]
pub async fn detail(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = load_order(&state, id).await?;
    ensure_resource_owner(&state, &auth.0, order.user_id).await?;
    Ok(Json(order))
}

/// Change an order's status. Admin only.
#[instrument(skip(state, auth))]
pub async fn update_status(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    ensure_admin(&state, &auth.0).await?;
    let order = OrderRepository::new(state.orders())
        .update_status(id, body.status, body.note)
        .await?;
    tracing::info!(order_id = %order.id, status = %order.status, "order status changed");
    Ok(Json(order))
}

/// Replace a pending order's items. Owner or admin.
#[instrument(skip(state, auth))]
pub async fn update_items(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateItemsRequest>,
) -> Result<Json<Order>> {
    let order = load_order(&state, id).await?;
    ensure_resource_owner(&state, &auth.0, order.user_id).await?;

    let updated = OrderRepository::new(state.orders())
        .update_items(id, body.items)
        .await?;
    Ok(Json(updated))
}

/// Cancel an order. Owner or admin.
#[instrument(skip(state, auth))]
pub async fn cancel(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = load_order(&state, id).await?;
    ensure_resource_owner(&state, &auth.0, order.user_id).await?;

    let cancelled = OrderRepository::new(state.orders()).cancel(id, None).await?;
    tracing::info!(order_id = %cancelled.id, "order cancelled");
    Ok(Json(cancelled))
}

/// Load an order or 404. Runs before ownership checks so a missing order is
/// reported as missing, not forbidden.
async fn load_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.orders())
        .get(id)
        .await?
        .ok_or_else(|| AppError::from(OrderError::NotFound(id)))
}
