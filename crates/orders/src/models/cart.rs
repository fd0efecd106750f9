//! Cart model: one cart per user, items keyed by product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use orchard_core::{CartId, ProductId, UserId};
use orchard_store::{Document, FileStore, StoreError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Bad input; rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// The product is not in the user's cart.
    #[error("product not in cart: {0}")]
    ItemNotFound(ProductId),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One line in a cart. Unique per `product_id` within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart document. At most one exists per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Cart {
    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

impl Cart {
    fn new_for(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::generate(),
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository for cart operations.
pub struct CartRepository<'a> {
    store: &'a FileStore<Cart>,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(store: &'a FileStore<Cart>) -> Self {
        Self { store }
    }

    /// Get the user's cart, creating an empty one if none exists.
    ///
    /// The one-cart-per-user invariant is enforced inside the store's
    /// serialized update cycle, so two concurrent calls cannot both create.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, CartError> {
        self.store
            .update(move |carts| {
                if let Some(cart) = carts.iter().find(|cart| cart.user_id == user_id) {
                    return Ok(cart.clone());
                }
                let cart = Cart::new_for(user_id);
                carts.push(cart.clone());
                Ok(cart)
            })
            .await
    }

    /// Add a product to the user's cart.
    ///
    /// Adding a product already present increments its quantity rather than
    /// duplicating the line.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero quantity, `Store` for storage failures.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity < 1 {
            return Err(CartError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        self.store
            .update(move |carts| {
                if !carts.iter().any(|cart| cart.user_id == user_id) {
                    carts.push(Cart::new_for(user_id));
                }
                let cart = carts
                    .iter_mut()
                    .find(|cart| cart.user_id == user_id)
                    .ok_or_else(|| {
                        CartError::Validation("cart vanished during insert".to_string())
                    })?;

                match cart
                    .items
                    .iter_mut()
                    .find(|item| item.product_id == product_id)
                {
                    Some(item) => item.quantity = item.quantity.saturating_add(quantity),
                    None => cart.items.push(CartItem {
                        product_id,
                        quantity,
                    }),
                }
                cart.updated_at = Utc::now();
                Ok(cart.clone())
            })
            .await
    }

    /// Set a product's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the product is not in the cart.
    pub async fn set_item_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.store
            .update(move |carts| {
                let cart = carts
                    .iter_mut()
                    .find(|cart| cart.user_id == user_id)
                    .ok_or(CartError::ItemNotFound(product_id))?;

                let position = cart
                    .items
                    .iter()
                    .position(|item| item.product_id == product_id)
                    .ok_or(CartError::ItemNotFound(product_id))?;

                if quantity == 0 {
                    cart.items.remove(position);
                } else if let Some(item) = cart.items.get_mut(position) {
                    item.quantity = quantity;
                }
                cart.updated_at = Utc::now();
                Ok(cart.clone())
            })
            .await
    }

    /// Remove a product from the user's cart.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the product is not in the cart.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        self.set_item_quantity(user_id, product_id, 0).await
    }

    /// Empty the user's cart. A no-op if the user has no cart.
    ///
    /// # Errors
    ///
    /// `Store` for storage failures.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        self.store
            .update(move |carts| {
                if let Some(cart) = carts.iter_mut().find(|cart| cart.user_id == user_id) {
                    cart.items.clear();
                    cart.updated_at = Utc::now();
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store_in(dir: &TempDir) -> FileStore<Cart> {
        FileStore::new(dir.path().join("carts.json"), "carts")
    }

    #[tokio::test]
    async fn test_get_or_create_is_single_per_user() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);
        let user_id = UserId::generate();

        let first = repo.get_or_create(user_id).await.unwrap();
        let second = repo.get_or_create(user_id).await.unwrap();
        assert_eq!(first.id, second.id);

        let collection = store.read().await.unwrap();
        assert_eq!(collection.items.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_create_existing_cart_does_not_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);
        let user_id = UserId::generate();

        repo.get_or_create(user_id).await.unwrap();
        let before = std::fs::metadata(store.path()).unwrap().modified().unwrap();

        repo.get_or_create(user_id).await.unwrap();

        let after = std::fs::metadata(store.path()).unwrap().modified().unwrap();
        assert_eq!(
            before, after,
            "fetching an existing cart must not rewrite the file"
        );
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_quantity() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);
        let user_id = UserId::generate();
        let product_id = ProductId::generate();

        repo.add_item(user_id, product_id, 2).await.unwrap();
        let cart = repo.add_item(user_id, product_id, 3).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_add_item_creates_cart_lazily() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);

        let cart = repo
            .add_item(UserId::generate(), ProductId::generate(), 1)
            .await
            .unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);

        let err = repo
            .add_item(UserId::generate(), ProductId::generate(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        // Rejected before the store was touched.
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);
        let user_id = UserId::generate();
        let product_id = ProductId::generate();

        repo.add_item(user_id, product_id, 2).await.unwrap();
        let cart = repo
            .set_item_quantity(user_id, product_id, 0)
            .await
            .unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_item() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);
        let user_id = UserId::generate();

        repo.add_item(user_id, ProductId::generate(), 1)
            .await
            .unwrap();
        let err = repo
            .remove_item(user_id, ProductId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let repo = CartRepository::new(&store);
        let user_id = UserId::generate();

        repo.add_item(user_id, ProductId::generate(), 1)
            .await
            .unwrap();
        repo.add_item(user_id, ProductId::generate(), 2)
            .await
            .unwrap();
        repo.clear(user_id).await.unwrap();

        let cart = repo.get_or_create(user_id).await.unwrap();
        assert!(cart.items.is_empty());
    }
}
