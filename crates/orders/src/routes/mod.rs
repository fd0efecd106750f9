//! HTTP route handlers for the orders service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Health check
//!
//! # Products (catalog reads are public)
//! GET    /products                        - Active product listing
//! GET    /products/{id}                   - Product detail
//! POST   /products                        - Create product (admin)
//! DELETE /products/{id}                   - Deactivate product (admin)
//!
//! # Orders (require auth)
//! POST   /orders                          - Create order (self or admin)
//! GET    /orders                          - List all orders (admin)
//! GET    /orders/mine                     - List own orders
//! GET    /orders/{id}                     - Order detail (owner or admin)
//! PATCH  /orders/{id}/status              - Change status (admin)
//! PATCH  /orders/{id}/items               - Replace items while pending (owner)
//! DELETE /orders/{id}                     - Cancel (owner or admin)
//!
//! # Cart (always self-scoped)
//! GET    /carts/me                        - Own cart (created lazily)
//! POST   /carts/me/items                  - Add item
//! PATCH  /carts/me/items/{product_id}     - Set quantity (0 removes)
//! DELETE /carts/me/items/{product_id}     - Remove item
//! DELETE /carts/me                        - Clear cart
//!
//! # Payments (require auth)
//! POST   /orders/{id}/payments            - Record pending payment (owner)
//! GET    /orders/{id}/payments            - Payments for order (owner or admin)
//! GET    /payments/{id}                   - Payment detail (owner or admin)
//! PATCH  /payments/{id}/status            - Change status (admin)
//! ```

pub mod carts;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::state::AppState;

/// Assemble the full application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/products",
            get(products::list).post(products::create),
        )
        .route(
            "/products/{id}",
            get(products::detail).delete(products::deactivate),
        )
        .route("/orders", post(orders::create).get(orders::list_all))
        .route("/orders/mine", get(orders::list_mine))
        .route(
            "/orders/{id}",
            get(orders::detail).delete(orders::cancel),
        )
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/orders/{id}/items", patch(orders::update_items))
        .route(
            "/orders/{id}/payments",
            post(payments::create).get(payments::list_for_order),
        )
        .route("/payments/{id}", get(payments::detail))
        .route("/payments/{id}/status", patch(payments::update_status))
        .route("/carts/me", get(carts::mine).delete(carts::clear))
        .route("/carts/me/items", post(carts::add_item))
        .route(
            "/carts/me/items/{product_id}",
            patch(carts::set_item_quantity).delete(carts::remove_item),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
