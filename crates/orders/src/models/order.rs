//! Order model: lifecycle, item rules, and total computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use orchard_core::{OrderId, OrderStatus, Price, ProductId, UserId};
use orchard_store::{Document, FileStore, StoreError};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Bad input; rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// No order with the given ID.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The requested status change violates the lifecycle.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One line item on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The purchased product.
    pub product_id: ProductId,
    /// Units purchased; always >= 1.
    pub quantity: u32,
    /// Unit price at time of purchase.
    pub unit_price: Price,
}

/// Shipping address captured at order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    fn validate(&self) -> Result<(), OrderError> {
        if self.line1.trim().is_empty()
            || self.city.trim().is_empty()
            || self.postal_code.trim().is_empty()
            || self.country.trim().is_empty()
        {
            return Err(OrderError::Validation(
                "shipping address requires line1, city, postal_code, and country".to_string(),
            ));
        }
        Ok(())
    }
}

/// One entry in the append-only status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    /// The status entered.
    pub status: OrderStatus,
    /// When the change happened.
    pub at: DateTime<Utc>,
    /// Optional operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// An order document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub status: OrderStatus,
    /// Append-only audit trail alongside the mutable `status` field.
    pub status_history: Vec<StatusChange>,
    /// Sum of `unit_price * quantity` over items. Recomputed only on writes
    /// that alter items, never on read.
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Order {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// Input for creating an order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Address,
}

/// One requested line item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    store: &'a FileStore<Order>,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a FileStore<Order>) -> Self {
        Self { store }
    }

    /// Create an order in `pending` status.
    ///
    /// Validates items (at least one, every quantity >= 1, single currency)
    /// and the shipping address before touching the store. The initial
    /// status-history entry records `pending`.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input, `Store` for storage failures.
    pub async fn create(&self, new: NewOrder) -> Result<Order, OrderError> {
        let items = validate_items(&new.items)?;
        new.shipping_address.validate()?;
        let total = compute_total(&items)?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            user_id: new.user_id,
            items,
            shipping_address: new.shipping_address,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                at: now,
                note: None,
            }],
            total,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(order.clone()).await?;
        Ok(order)
    }

    /// Get one order by ID.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.store.find(id.as_uuid()).await?)
    }

    /// List every order. Admin surface.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn list(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.read().await?.items)
    }

    /// List one user's orders.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        let collection = self.store.read().await?;
        Ok(collection
            .items
            .into_iter()
            .filter(|order| order.user_id == user_id)
            .collect())
    }

    /// Change an order's status, appending one status-history entry.
    ///
    /// `created_at` is never touched; `updated_at` is refreshed.
    ///
    /// # Errors
    ///
    /// `NotFound` if the order does not exist, `InvalidTransition` if the
    /// lifecycle forbids the change (nothing is written in either case).
    pub async fn update_status(
        &self,
        id: OrderId,
        target: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, OrderError> {
        self.store
            .update(move |items| {
                let order = items
                    .iter_mut()
                    .find(|order| order.id == id)
                    .ok_or(OrderError::NotFound(id))?;

                if !order.status.can_transition_to(target) {
                    return Err(OrderError::InvalidTransition {
                        from: order.status,
                        to: target,
                    });
                }

                let now = Utc::now();
                order.status = target;
                order.status_history.push(StatusChange {
                    status: target,
                    at: now,
                    note,
                });
                order.updated_at = now;
                Ok(order.clone())
            })
            .await
    }

    /// Cancel an order (status transition to `cancelled`).
    ///
    /// # Errors
    ///
    /// Same surface as [`Self::update_status`].
    pub async fn cancel(&self, id: OrderId, note: Option<String>) -> Result<Order, OrderError> {
        self.update_status(id, OrderStatus::Cancelled, note).await
    }

    /// Replace a pending order's items, recomputing the total.
    ///
    /// Items are only mutable while the order is `pending`; once fulfillment
    /// starts the line items are frozen.
    ///
    /// # Errors
    ///
    /// `Validation` if the items are invalid or the order is past `pending`,
    /// `NotFound` if the order does not exist.
    pub async fn update_items(
        &self,
        id: OrderId,
        new_items: Vec<NewOrderItem>,
    ) -> Result<Order, OrderError> {
        let items = validate_items(&new_items)?;
        let total = compute_total(&items)?;

        self.store
            .update(move |orders| {
                let order = orders
                    .iter_mut()
                    .find(|order| order.id == id)
                    .ok_or(OrderError::NotFound(id))?;

                if order.status != OrderStatus::Pending {
                    return Err(OrderError::Validation(format!(
                        "items can only be changed while pending (status is {})",
                        order.status
                    )));
                }

                order.items = items;
                order.total = total;
                order.updated_at = Utc::now();
                Ok(order.clone())
            })
            .await
    }
}

/// Validate requested items: at least one, quantities >= 1.
fn validate_items(items: &[NewOrderItem]) -> Result<Vec<OrderItem>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::Validation(
            "an order requires at least one item".to_string(),
        ));
    }
    items
        .iter()
        .map(|item| {
            if item.quantity < 1 {
                return Err(OrderError::Validation(format!(
                    "invalid quantity for product {}: must be at least 1",
                    item.product_id
                )));
            }
            Ok(OrderItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
        })
        .collect()
}

/// Sum `unit_price * quantity` over items, rejecting mixed currencies and
/// totals outside the decimal range. Prices come from request bodies, so
/// overflow is a validation failure, not a panic.
fn compute_total(items: &[OrderItem]) -> Result<Price, OrderError> {
    let mut iter = items.iter();
    let first = iter
        .next()
        .ok_or_else(|| OrderError::Validation("an order requires at least one item".to_string()))?;
    let mut total = line_total(first)?;
    for item in iter {
        let line = line_total(item)?;
        if line.currency_code != total.currency_code {
            return Err(OrderError::Validation(
                "order items must share one currency".to_string(),
            ));
        }
        total = total.checked_add(&line).ok_or_else(|| {
            OrderError::Validation("order total exceeds the representable amount".to_string())
        })?;
    }
    Ok(total)
}

fn line_total(item: &OrderItem) -> Result<Price, OrderError> {
    item.unit_price.times(item.quantity).ok_or_else(|| {
        OrderError::Validation(format!(
            "line total for product {} exceeds the representable amount",
            item.product_id
        ))
    })
}
