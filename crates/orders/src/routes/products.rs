//! Product catalog route handlers.
//!
//! Reads are public; catalog writes require administrative privilege.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use orchard_core::ProductId;

use crate::error::Result;
use crate::middleware::{RequireAuth, ensure_admin};
use crate::models::{NewProduct, Product, ProductRepository};
use crate::state::AppState;

/// List active products.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.products()).list_active().await?;
    Ok(Json(products))
}

/// Fetch one product by id.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.products()).get(id).await?;
    Ok(Json(product))
}

/// Add a product to the catalog. Admin only.
#[instrument(skip(state, auth))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<NewProduct>,
) -> Result<Response> {
    ensure_admin(&state, &auth.0).await?;
    let product = ProductRepository::new(state.products()).create(body).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// Deactivate a product. Admin only.
#[instrument(skip(state, auth))]
pub async fn deactivate(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ensure_admin(&state, &auth.0).await?;
    let product = ProductRepository::new(state.products()).deactivate(id).await?;
    tracing::info!(product_id = %product.id, "product deactivated");
    Ok(Json(product))
}
