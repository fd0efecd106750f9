//! Cart route handlers.
//!
//! Every cart route operates on the caller's own cart; there is no way to
//! address another user's cart, so no ownership guard is needed beyond
//! authentication itself.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use orchard_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Cart, CartRepository};
use crate::state::AppState;

/// Body for `POST /carts/me/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body for `PATCH /carts/me/items/{product_id}`.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

/// Fetch the caller's cart, creating an empty one on first access.
#[instrument(skip(state, auth))]
pub async fn mine(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<Cart>> {
    let cart = CartRepository::new(state.carts())
        .get_or_create(auth.0.identity.subject_id)
        .await?;
    Ok(Json(cart))
}

/// Add a product to the caller's cart.
#[instrument(skip(state, auth))]
pub async fn add_item(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<Cart>> {
    let cart = CartRepository::new(state.carts())
        .add_item(auth.0.identity.subject_id, body.product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, auth))]
pub async fn set_item_quantity(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(body): Json<SetQuantityRequest>,
) -> Result<Json<Cart>> {
    let cart = CartRepository::new(state.carts())
        .set_item_quantity(auth.0.identity.subject_id, product_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove a product from the caller's cart.
#[instrument(skip(state, auth))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    let cart = CartRepository::new(state.carts())
        .remove_item(auth.0.identity.subject_id, product_id)
        .await?;
    Ok(Json(cart))
}

/// Empty the caller's cart.
#[instrument(skip(state, auth))]
pub async fn clear(State(state): State<AppState>, auth: RequireAuth) -> Result<StatusCode> {
    CartRepository::new(state.carts())
        .clear(auth.0.identity.subject_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
