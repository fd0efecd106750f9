//! Authentication middleware and extractors.
//!
//! Implements the per-request authentication state machine:
//!
//! 1. No bearer token → 401 `AUTH_TOKEN_MISSING`.
//! 2. Local verify (signature, expiry, not-before, subject claim) → specific
//!    401/403 code on failure.
//! 3. Remote reconcile: the identity service's verdict is adopted when it
//!    answers. An explicit rejection is terminal — it overrides local trust.
//!    When the service is unreachable, the locally verified claims are
//!    honored and the identity is tagged `local-fallback`. This is a
//!    deliberate availability-over-consistency trade-off.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use orchard_core::Identity;

use crate::services::token::TokenError;
use crate::state::AppState;

/// An authenticated request context: the resolved identity plus the raw
/// bearer token, which guards forward to the identity service so downstream
/// authorization happens under the caller's own credential.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated identity.
    pub identity: Identity,
    /// The raw bearer token as presented.
    pub token: String,
}

/// Extractor that requires bearer-token authentication.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(ctx): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", ctx.identity.subject_id)
/// }
/// ```
pub struct RequireAuth(pub AuthContext);

/// Error returned when authentication fails.
///
/// Every variant maps to a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header present.
    MissingToken,
    /// Local verification failed (signature, structure, validity window,
    /// or claims).
    Token(TokenError),
    /// The identity service explicitly invalidated the token.
    Rejected,
}

impl AuthRejection {
    /// Stable machine-readable code for this rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "AUTH_TOKEN_MISSING",
            Self::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            Self::Token(TokenError::Malformed) => "TOKEN_MALFORMED",
            Self::Token(TokenError::NotYetActive) => "TOKEN_NOT_ACTIVE",
            Self::Token(TokenError::InvalidClaims(_)) => "TOKEN_INVALID_CLAIMS",
            Self::Rejected => "TOKEN_REJECTED",
        }
    }

    /// HTTP status for this rejection. Transport-shaped problems are 401;
    /// claims-shaped problems are 403.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::Token(TokenError::Expired | TokenError::Malformed)
            | Self::Rejected => StatusCode::UNAUTHORIZED,
            Self::Token(TokenError::NotYetActive | TokenError::InvalidClaims(_)) => {
                StatusCode::FORBIDDEN
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingToken => "authentication token missing".to_string(),
            Self::Token(err) => err.to_string(),
            Self::Rejected => "token rejected by identity service".to_string(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message(), "code": self.code() });
        (self.status(), Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;

        // Local verification first: a token that fails signature or expiry
        // checks is rejected without ever consulting the identity service.
        let local = state
            .token_verifier()
            .verify(&token)
            .map_err(AuthRejection::Token)?;

        // Remote reconciliation. The remote verdict is authoritative when it
        // arrives; unavailability falls back to the locally verified claims.
        match state.identity().verify_token(&token).await {
            Ok(remote) => {
                tracing::debug!(subject = %remote.subject_id, "token verified remotely");
                Ok(Self(AuthContext {
                    identity: remote,
                    token,
                }))
            }
            Err(err) if err.is_rejection() => {
                tracing::info!(subject = %local.subject_id, "token explicitly rejected by identity service");
                Err(AuthRejection::Rejected)
            }
            Err(err) => {
                debug_assert!(err.is_unavailable());
                tracing::warn!(
                    subject = %local.subject_id,
                    error = %err,
                    "identity service unreachable, honoring locally verified token"
                );
                Ok(Self(AuthContext {
                    identity: local,
                    token,
                }))
            }
        }
    }
}

/// Extract the bearer token from the `Authorization` header.
fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}
