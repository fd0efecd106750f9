//! Application state shared across handlers.

use std::sync::Arc;

use orchard_store::{FileStore, StoreError};

use crate::config::OrdersConfig;
use crate::models::{Cart, Order, Payment, Product};
use crate::services::identity::IdentityClient;
use crate::services::token::TokenVerifier;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; holds the identity client, the token
/// verifier, and one file-backed store per collection.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: OrdersConfig,
    identity: IdentityClient,
    token_verifier: TokenVerifier,
    orders: FileStore<Order>,
    carts: FileStore<Cart>,
    products: FileStore<Product>,
    payments: FileStore<Payment>,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// Store files are placed under `config.data_dir` but not created here;
    /// call [`Self::init_stores`] before serving.
    #[must_use]
    pub fn new(config: OrdersConfig) -> Self {
        let identity = IdentityClient::new(config.identity_url.clone(), config.identity_timeout);
        let token_verifier = TokenVerifier::new(&config.token_secret);
        let data_dir = config.data_dir.clone();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                token_verifier,
                orders: FileStore::new(data_dir.join("orders.json"), "orders"),
                carts: FileStore::new(data_dir.join("carts.json"), "carts"),
                products: FileStore::new(data_dir.join("products.json"), "products"),
                payments: FileStore::new(data_dir.join("payments.json"), "payments"),
            }),
        }
    }

    /// Ensure the data directory and every collection file exist.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the directory or any file cannot be created.
    pub async fn init_stores(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.inner.config.data_dir).await?;
        self.inner.orders.init().await?;
        self.inner.carts.init().await?;
        self.inner.products.init().await?;
        self.inner.payments.init().await?;
        Ok(())
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &OrdersConfig {
        &self.inner.config
    }

    /// Get a reference to the identity service client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the local token verifier.
    #[must_use]
    pub fn token_verifier(&self) -> &TokenVerifier {
        &self.inner.token_verifier
    }

    /// Get a reference to the orders collection.
    #[must_use]
    pub fn orders(&self) -> &FileStore<Order> {
        &self.inner.orders
    }

    /// Get a reference to the carts collection.
    #[must_use]
    pub fn carts(&self) -> &FileStore<Cart> {
        &self.inner.carts
    }

    /// Get a reference to the products collection.
    #[must_use]
    pub fn products(&self) -> &FileStore<Product> {
        &self.inner.products
    }

    /// Get a reference to the payments collection.
    #[must_use]
    pub fn payments(&self) -> &FileStore<Payment> {
        &self.inner.payments
    }
}
