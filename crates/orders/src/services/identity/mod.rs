//! Identity service HTTP client.
//!
//! Encapsulates every call the orders service makes to the remote identity
//! service. Each call carries the caller's bearer token for downstream
//! authorization and applies a fixed request timeout. Network-class failures
//! and 429s are retried a bounded number of times; other 4xx responses are
//! mapped to typed errors and never retried.

mod error;

pub use error::IdentityError;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use orchard_core::{Identity, Role, UserId, VerifiedBy};

/// Retry attempts for retry-eligible failures (429, network-class).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay between retries; doubled per attempt, with jitter.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// A user record returned by the identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    /// The user's ID.
    pub id: UserId,
    /// The user's role as the identity service knows it.
    #[serde(default)]
    pub role: Role,
    /// Contact email, if the identity service exposes it.
    #[serde(default)]
    pub email: Option<String>,
}

/// Response from `POST /auth/verify-token`.
#[derive(Debug, Deserialize)]
struct VerifyTokenResponse {
    valid: bool,
    #[serde(default)]
    user: Option<VerifiedUser>,
}

#[derive(Debug, Deserialize)]
struct VerifiedUser {
    id: UserId,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Identity service API client.
///
/// Cheaply cloneable; the underlying HTTP client and configuration are shared
/// behind an `Arc`.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl IdentityClient {
    /// Create a client for the identity service at `base_url`.
    ///
    /// Every request made through this client carries `timeout` as its
    /// overall deadline.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(IdentityClientInner { client, base_url }),
        }
    }

    /// Fetch a user by ID.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing user, `Rejected` if the token is refused,
    /// `ServiceUnavailable`/`Timeout` for network-class failures.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId, token: &str) -> Result<RemoteUser, IdentityError> {
        let url = self.endpoint(&format!("users/{id}"))?;
        let response = self
            .send_with_retry(|| self.inner.client.get(url.clone()).bearer_auth(token))
            .await?;

        match response.status() {
            status if status.is_success() => response
                .json::<RemoteUser>()
                .await
                .map_err(|err| IdentityError::InvalidResponse(err.to_string())),
            reqwest::StatusCode::NOT_FOUND => Err(IdentityError::NotFound),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(IdentityError::Rejected)
            }
            status => Err(IdentityError::ServiceUnavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }

    /// Check that a user exists and is visible to the caller.
    ///
    /// Semantic rejections (missing user, refused token) map to `Ok(false)`,
    /// never to an error; only unavailability surfaces as `Err`.
    ///
    /// # Errors
    ///
    /// `ServiceUnavailable`/`Timeout` when the identity service cannot be
    /// reached.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn validate_user(&self, id: UserId, token: &str) -> Result<bool, IdentityError> {
        match self.get_user(id, token).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_rejection() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Check whether a user holds the admin role.
    ///
    /// # Errors
    ///
    /// Same surface as [`Self::get_user`].
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn is_admin(&self, id: UserId, token: &str) -> Result<bool, IdentityError> {
        let user = self.get_user(id, token).await?;
        Ok(user.role.is_admin())
    }

    /// Ask the identity service to verify a bearer token.
    ///
    /// On success the remote-returned identity is adopted wholesale (tagged
    /// [`VerifiedBy::Remote`]); it is preferred over locally decoded claims.
    ///
    /// # Errors
    ///
    /// `Rejected` when the remote explicitly invalidates the token,
    /// `ServiceUnavailable`/`Timeout` for network-class failures,
    /// `InvalidResponse` when a success body is missing the user record.
    #[instrument(skip_all)]
    pub async fn verify_token(&self, token: &str) -> Result<Identity, IdentityError> {
        let url = self.endpoint("auth/verify-token")?;
        let response = self
            .send_with_retry(|| {
                self.inner
                    .client
                    .post(url.clone())
                    .json(&serde_json::json!({ "token": token }))
            })
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: VerifyTokenResponse = response
                    .json()
                    .await
                    .map_err(|err| IdentityError::InvalidResponse(err.to_string()))?;
                if !body.valid {
                    return Err(IdentityError::Rejected);
                }
                let user = body.user.ok_or_else(|| {
                    IdentityError::InvalidResponse("valid=true but no user record".to_string())
                })?;
                Ok(Identity {
                    subject_id: user.id,
                    role: user.role,
                    issued_at: user
                        .iat
                        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                        .unwrap_or_else(chrono::Utc::now),
                    expires_at: user
                        .exp
                        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                        .unwrap_or_else(chrono::Utc::now),
                    verified_by: VerifiedBy::Remote,
                })
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(IdentityError::Rejected)
            }
            status => Err(IdentityError::ServiceUnavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }

    /// Resolve a path against the configured base URL.
    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|err| IdentityError::InvalidResponse(format!("bad endpoint path: {err}")))
    }

    /// Send a request, retrying 429s and network-class failures with
    /// exponential backoff and jitter. Other responses return immediately.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, IdentityError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_err: Option<IdentityError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let backoff = RETRY_BASE_DELAY * 2_u32.saturating_pow(attempt - 1);
                let jitter = Duration::from_millis(rand::rng().random_range(0..50));
                tokio::time::sleep(backoff + jitter).await;
            }

            match build().send().await {
                Ok(response) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    last_err = Some(IdentityError::ServiceUnavailable(
                        "rate limited (429)".to_string(),
                    ));
                }
                Ok(response) => return Ok(response),
                Err(err) => {
                    last_err = Some(IdentityError::from(err));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            IdentityError::ServiceUnavailable("retries exhausted".to_string())
        }))
    }
}
