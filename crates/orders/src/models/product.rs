//! Product catalog model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use orchard_core::{Price, ProductId};
use orchard_store::{Document, FileStore, StoreError};

/// Errors from product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Bad input; rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// No product with the given id.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A catalog entry. Inactive products stay on file for order history but are
/// hidden from listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Product {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
}

/// Repository for catalog operations.
pub struct ProductRepository<'a> {
    store: &'a FileStore<Product>,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a FileStore<Product>) -> Self {
        Self { store }
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty name or non-positive price, `Store` for
    /// storage failures.
    pub async fn create(&self, new: NewProduct) -> Result<Product, ProductError> {
        if new.name.trim().is_empty() {
            return Err(ProductError::Validation(
                "product name must not be empty".to_string(),
            ));
        }
        if new.price.amount <= Decimal::ZERO {
            return Err(ProductError::Validation(
                "product price must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: new.name,
            description: new.description,
            price: new.price,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(product.clone()).await?;
        Ok(product)
    }

    /// List active products.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn list_active(&self) -> Result<Vec<Product>, ProductError> {
        let collection = self.store.read().await?;
        Ok(collection
            .items
            .into_iter()
            .filter(|product| product.active)
            .collect())
    }

    /// Fetch one product by id, active or not.
    ///
    /// # Errors
    ///
    /// `NotFound` when no product has the given id.
    pub async fn get(&self, id: ProductId) -> Result<Product, ProductError> {
        self.store
            .find(id.as_uuid())
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Mark a product inactive. Existing orders keep their line items.
    ///
    /// # Errors
    ///
    /// `NotFound` when no product has the given id.
    pub async fn deactivate(&self, id: ProductId) -> Result<Product, ProductError> {
        self.store
            .update(move |products| {
                let product = products
                    .iter_mut()
                    .find(|product| product.id == id)
                    .ok_or(ProductError::NotFound(id))?;
                product.active = false;
                product.updated_at = Utc::now();
                Ok(product.clone())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use orchard_core::CurrencyCode;

    use super::*;

    fn store_in(dir: &TempDir) -> FileStore<Product> {
        FileStore::new(dir.path().join("products.json"), "products")
    }

    fn sample(name: &str, cents: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: String::new(),
            price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = ProductRepository::new(&store);

        let created = repo.create(sample("Mug", 1299)).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = ProductRepository::new(&store);

        let err = repo.create(sample("   ", 1299)).await.unwrap_err();
        assert!(matches!(err, ProductError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_price() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = ProductRepository::new(&store);

        let err = repo.create(sample("Mug", 0)).await.unwrap_err();
        assert!(matches!(err, ProductError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_hides_inactive() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = ProductRepository::new(&store);

        let kept = repo.create(sample("Mug", 1299)).await.unwrap();
        let dropped = repo.create(sample("Plate", 899)).await.unwrap();
        repo.deactivate(dropped.id).await.unwrap();

        let listed = repo.list_active().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().unwrap().id, kept.id);

        // Still fetchable directly.
        assert!(!repo.get(dropped.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = ProductRepository::new(&store);

        let err = repo.get(ProductId::generate()).await.unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));
    }
}
