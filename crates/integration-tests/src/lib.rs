//! Integration test harness for Orchard.
//!
//! Spins up the orders service in-process on an ephemeral port, backed by a
//! temporary data directory and a stub identity service whose verdicts the
//! tests control. Three identity configurations cover the interesting
//! behaviors:
//!
//! - a live stub that answers user lookups and token verifications,
//! - a stub that explicitly rejects tokens,
//! - a dead address (bound then dropped) to exercise the unavailability
//!   fallback paths.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orchard-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

pub mod stub_identity;

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

use orchard_core::{Role, UserId};
use orchard_orders::config::OrdersConfig;
use orchard_orders::routes;
use orchard_orders::services::token::{Claims, issue_token};
use orchard_orders::state::AppState;

/// High-entropy signing secret shared by the app under test and the token
/// helpers below.
const TEST_TOKEN_SECRET: &str = "k9#mQ2$vX7!pL4@nR8%wT3^zB6&cF1*d";

/// A running orders service under test.
pub struct TestApp {
    /// Base URL of the service, e.g. `http://127.0.0.1:49301`.
    pub base_url: String,
    /// HTTP client for requests against the service.
    pub client: reqwest::Client,
    /// The signing secret the service verifies tokens with.
    pub secret: SecretString,
    // Dropped with the app; deletes the collection files.
    _data_dir: TempDir,
}

impl TestApp {
    /// Start the orders service on an ephemeral port against the given
    /// identity service URL.
    pub async fn spawn(identity_url: Url) -> Self {
        let data_dir = TempDir::new().expect("create temp data dir");
        let secret = SecretString::from(TEST_TOKEN_SECRET);

        let config = OrdersConfig {
            host: "127.0.0.1".parse().expect("loopback addr"),
            port: 0,
            data_dir: data_dir.path().to_path_buf(),
            identity_url,
            identity_timeout: Duration::from_secs(2),
            token_secret: secret.clone(),
        };

        let state = AppState::new(config);
        state.init_stores().await.expect("init stores");

        let app = routes::router().with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            secret,
            _data_dir: data_dir,
        }
    }

    /// Build a full URL for a path under the app.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Sign a bearer token for `user_id` valid for one hour.
#[must_use]
pub fn token_for(secret: &SecretString, user_id: UserId, role: Role) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now,
        exp: now + 3600,
        nbf: None,
    };
    issue_token(secret, &claims).expect("sign test token")
}

/// Sign a bearer token that expired an hour ago.
#[must_use]
pub fn expired_token_for(secret: &SecretString, user_id: UserId) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: Role::User,
        iat: now - 7200,
        exp: now - 3600,
        nbf: None,
    };
    issue_token(secret, &claims).expect("sign test token")
}

/// A valid order-creation body: one line of 2 x 19.99 USD.
#[must_use]
pub fn sample_order_body(user_id: UserId) -> serde_json::Value {
    serde_json::json!({
        "user_id": user_id,
        "items": [{
            "product_id": uuid::Uuid::new_v4(),
            "quantity": 2,
            "unit_price": { "amount": "19.99", "currency_code": "USD" },
        }],
        "shipping_address": {
            "line1": "1 Orchard Way",
            "city": "Portland",
            "postal_code": "97201",
            "country": "US",
        },
    })
}

/// Produce a URL that refuses connections: bind an ephemeral port, note the
/// address, and drop the listener.
pub async fn dead_identity_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr: SocketAddr = listener.local_addr().expect("listener addr");
    drop(listener);
    format!("http://{addr}/").parse().expect("valid url")
}
