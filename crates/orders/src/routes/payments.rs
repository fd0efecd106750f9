//! Payment route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use orchard_core::{OrderId, PaymentId, PaymentStatus};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, ensure_admin, ensure_resource_owner};
use crate::models::{Order, OrderError, OrderRepository, Payment, PaymentRepository};
use crate::state::AppState;

/// Body for `PATCH /payments/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PaymentStatus,
}

/// Record a pending payment for an order, frozen at the order's current
/// total. Owner or admin.
#[instrument(skip(state, auth))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Response> {
    let order = load_order(&state, order_id).await?;
    ensure_resource_owner(&state, &auth.0, order.user_id).await?;

    let payment = PaymentRepository::new(state.payments())
        .create_for_order(&order)
        .await?;
    tracing::info!(payment_id = %payment.id, order_id = %order.id, "payment recorded");
    Ok((StatusCode::CREATED, Json(payment)).into_response())
}

/// List payments recorded against an order. Owner or admin.
#[instrument(skip(state, auth))]
pub async fn list_for_order(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Vec<Payment>>> {
    let order = load_order(&state, order_id).await?;
    ensure_resource_owner(&state, &auth.0, order.user_id).await?;

    let payments = PaymentRepository::new(state.payments())
        .list_for_order(order_id)
        .await?;
    Ok(Json(payments))
}

/// Fetch one payment. Owner or admin.
#[instrument(skip(state, auth))]
pub async fn detail(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>> {
    let payment = PaymentRepository::new(state.payments()).get(id).await?;
    ensure_resource_owner(&state, &auth.0, payment.user_id).await?;
    Ok(Json(payment))
}

/// Change a payment's status. Admin only.
#[instrument(skip(state, auth))]
pub async fn update_status(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<PaymentId>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Payment>> {
    ensure_admin(&state, &auth.0).await?;
    let payment = PaymentRepository::new(state.payments())
        .update_status(id, body.status)
        .await?;
    tracing::info!(payment_id = %payment.id, status = %payment.status, "payment status changed");
    Ok(Json(payment))
}

async fn load_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.orders())
        .get(id)
        .await?
        .ok_or_else(|| AppError::from(OrderError::NotFound(id)))
}
