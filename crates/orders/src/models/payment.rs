//! Payment model: one payment record per capture attempt, tied to an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use orchard_core::{OrderId, PaymentId, PaymentStatus, Price, UserId};
use orchard_store::{Document, FileStore, StoreError};

use crate::models::order::Order;

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No payment with the given id.
    #[error("payment not found: {0}")]
    NotFound(PaymentId),

    /// The requested status change violates the payment lifecycle.
    #[error("invalid payment status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A payment document. The amount is frozen from the order total at creation;
/// later item edits on the order do not reprice an existing payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Price,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Payment {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// Repository for payment operations.
pub struct PaymentRepository<'a> {
    store: &'a FileStore<Payment>,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(store: &'a FileStore<Payment>) -> Self {
        Self { store }
    }

    /// Create a `pending` payment covering the order's current total.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn create_for_order(&self, order: &Order) -> Result<Payment, PaymentError> {
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::generate(),
            order_id: order.id,
            user_id: order.user_id,
            amount: order.total,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(payment.clone()).await?;
        Ok(payment)
    }

    /// Fetch one payment by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no payment has the given id.
    pub async fn get(&self, id: PaymentId) -> Result<Payment, PaymentError> {
        self.store
            .find(id.as_uuid())
            .await?
            .ok_or(PaymentError::NotFound(id))
    }

    /// List payments recorded against one order.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn list_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, PaymentError> {
        let collection = self.store.read().await?;
        Ok(collection
            .items
            .into_iter()
            .filter(|payment| payment.order_id == order_id)
            .collect())
    }

    /// Change a payment's status.
    ///
    /// # Errors
    ///
    /// `NotFound` if the payment does not exist, `InvalidTransition` if the
    /// lifecycle forbids the change (nothing is written in either case).
    pub async fn update_status(
        &self,
        id: PaymentId,
        target: PaymentStatus,
    ) -> Result<Payment, PaymentError> {
        self.store
            .update(move |payments| {
                let payment = payments
                    .iter_mut()
                    .find(|payment| payment.id == id)
                    .ok_or(PaymentError::NotFound(id))?;

                if !payment.status.can_transition_to(target) {
                    return Err(PaymentError::InvalidTransition {
                        from: payment.status,
                        to: target,
                    });
                }

                payment.status = target;
                payment.updated_at = Utc::now();
                Ok(payment.clone())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use orchard_core::{CurrencyCode, OrderStatus};

    use crate::models::order::{Address, OrderItem, StatusChange};

    use super::*;

    fn sample_order() -> Order {
        let now = Utc::now();
        let unit_price = Price::new(Decimal::new(2500, 2), CurrencyCode::USD);
        Order {
            id: OrderId::generate(),
            user_id: UserId::generate(),
            items: vec![OrderItem {
                product_id: orchard_core::ProductId::generate(),
                quantity: 2,
                unit_price,
            }],
            shipping_address: Address {
                line1: "1 Orchard Way".to_string(),
                line2: None,
                city: "Portland".to_string(),
                postal_code: "97201".to_string(),
                country: "US".to_string(),
            },
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                at: now,
                note: None,
            }],
            total: unit_price.times(2).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn store_in(dir: &TempDir) -> FileStore<Payment> {
        FileStore::new(dir.path().join("payments.json"), "payments")
    }

    #[tokio::test]
    async fn test_create_freezes_order_total() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = PaymentRepository::new(&store);

        let order = sample_order();
        let payment = repo.create_for_order(&order).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount.amount, Decimal::new(5000, 2));
        assert_eq!(payment.order_id, order.id);
    }

    #[tokio::test]
    async fn test_complete_then_refund() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = PaymentRepository::new(&store);

        let payment = repo.create_for_order(&sample_order()).await.unwrap();
        repo.update_status(payment.id, PaymentStatus::Completed)
            .await
            .unwrap();
        let refunded = repo
            .update_status(payment.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_failed_payment_cannot_be_refunded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = PaymentRepository::new(&store);

        let payment = repo.create_for_order(&sample_order()).await.unwrap();
        repo.update_status(payment.id, PaymentStatus::Failed)
            .await
            .unwrap();

        let err = repo
            .update_status(payment.id, PaymentStatus::Refunded)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidTransition { .. }));

        // The failed transition wrote nothing.
        let unchanged = repo.get(payment.id).await.unwrap();
        assert_eq!(unchanged.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_list_for_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = PaymentRepository::new(&store);

        let order = sample_order();
        repo.create_for_order(&order).await.unwrap();
        repo.create_for_order(&sample_order()).await.unwrap();

        let listed = repo.list_for_order(order.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = PaymentRepository::new(&store);

        let err = repo.get(PaymentId::generate()).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound(_)));
    }
}
