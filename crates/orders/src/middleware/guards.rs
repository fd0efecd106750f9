//! Authorization guards.
//!
//! Three independent checks consuming the authenticated [`AuthContext`]:
//!
//! - [`ensure_user_exists`]: the target user is known to the identity
//!   service. On unavailability, the authenticated identity can vouch for
//!   itself only — never for a third party.
//! - [`ensure_admin`]: a token-claimed admin role is granted immediately;
//!   otherwise the identity service decides. On unavailability the guard
//!   denies: elevated privilege is never granted on a best-effort basis.
//! - [`ensure_resource_owner`]: admin or subject match. On unavailability the
//!   union of both fallbacks (admin-by-token OR owner-by-token-id) applies
//!   before denying.
//!
//! The strictness asymmetry between `ensure_admin` and the other two is
//! intentional and must be preserved: self-access degrades gracefully,
//! privilege escalation does not.

use axum::http::StatusCode;
use thiserror::Error;

use orchard_core::UserId;

use crate::middleware::auth::AuthContext;
use crate::state::AppState;

/// How an authorization decision was reached. Logged with every grant so
/// fallback decisions stay auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationSource {
    /// The token's own claims were sufficient (admin role or subject match).
    TokenClaim,
    /// The identity service confirmed the check.
    Remote,
    /// The identity service was unreachable and the fallback policy granted
    /// self-access.
    LocalFallback,
}

impl AuthorizationSource {
    /// Stable audit-log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenClaim => "token-claim",
            Self::Remote => "remote",
            Self::LocalFallback => "local-fallback",
        }
    }
}

/// A guard rejection with a stable code and HTTP status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The caller lacks the privilege or ownership the operation requires.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Human-readable explanation.
        reason: String,
        /// Stable machine-readable code.
        code: &'static str,
    },

    /// The addressed user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The identity service is unreachable and no fallback applies.
    #[error("identity service unavailable, cannot authorize")]
    Unavailable,
}

impl GuardError {
    /// Stable machine-readable code for this rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Forbidden { code, .. } => code,
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Unavailable => "IDENTITY_UNAVAILABLE",
        }
    }

    /// HTTP status for this rejection.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn forbidden(reason: impl Into<String>, code: &'static str) -> Self {
        Self::Forbidden {
            reason: reason.into(),
            code,
        }
    }
}

/// Require that `target` exists in the identity service.
///
/// Fallback: when the identity service is unreachable, the authenticated
/// identity is trusted to exist *as itself* — a structurally valid token for
/// `target` is evidence enough. It cannot vouch for any other user.
///
/// # Errors
///
/// `UserNotFound` when the identity service says the user does not exist,
/// `Unavailable` when it cannot be reached and `target` is a third party.
pub async fn ensure_user_exists(
    state: &AppState,
    ctx: &AuthContext,
    target: UserId,
) -> Result<AuthorizationSource, GuardError> {
    match state.identity().validate_user(target, &ctx.token).await {
        Ok(true) => Ok(AuthorizationSource::Remote),
        Ok(false) => Err(GuardError::UserNotFound(target)),
        Err(err) => {
            if ctx.identity.is_subject(target) {
                tracing::warn!(
                    target = %target,
                    error = %err,
                    authorization_source = AuthorizationSource::LocalFallback.as_str(),
                    "identity service unreachable, trusting token subject for self-check"
                );
                Ok(AuthorizationSource::LocalFallback)
            } else {
                tracing::warn!(
                    target = %target,
                    error = %err,
                    "identity service unreachable, cannot vouch for third party"
                );
                Err(GuardError::Unavailable)
            }
        }
    }
}

/// Require administrative privilege.
///
/// The token-embedded role is authoritative for the optimistic path: a token
/// that claims admin is granted without a remote call. Otherwise the identity
/// service decides. On unavailability the guard denies — the token did not
/// claim admin (that path returned already), and privilege escalation is
/// never granted on a best-effort basis.
///
/// # Errors
///
/// `Forbidden` with code `ADMIN_REQUIRED` when the caller is not an admin or
/// the question cannot be answered.
pub async fn ensure_admin(
    state: &AppState,
    ctx: &AuthContext,
) -> Result<AuthorizationSource, GuardError> {
    if ctx.identity.is_admin() {
        return Ok(AuthorizationSource::TokenClaim);
    }

    match state
        .identity()
        .is_admin(ctx.identity.subject_id, &ctx.token)
        .await
    {
        Ok(true) => Ok(AuthorizationSource::Remote),
        Ok(false) => Err(GuardError::forbidden(
            "administrator privilege required",
            "ADMIN_REQUIRED",
        )),
        Err(err) if err.is_unavailable() => {
            tracing::warn!(
                subject = %ctx.identity.subject_id,
                error = %err,
                "identity service unreachable, denying admin privilege (strict fallback)"
            );
            Err(GuardError::forbidden(
                "administrator privilege required",
                "ADMIN_REQUIRED",
            ))
        }
        Err(err) => {
            tracing::info!(subject = %ctx.identity.subject_id, error = %err, "admin check rejected");
            Err(GuardError::forbidden(
                "administrator privilege required",
                "ADMIN_REQUIRED",
            ))
        }
    }
}

/// Require that the caller owns the resource (or is an admin).
///
/// The ownership comparison is local and always available. The admin path
/// follows [`ensure_admin`]'s logic. On unavailability, the union of both
/// fallbacks applies: admin-by-token or owner-by-token-id; if neither holds
/// the guard rejects with 503 rather than 403, since no authority could
/// answer.
///
/// # Errors
///
/// `Forbidden` with code `NOT_RESOURCE_OWNER` when the remote authority says
/// the caller is neither owner nor admin; `Unavailable` when it cannot be
/// reached and no token-based fallback applies.
pub async fn ensure_resource_owner(
    state: &AppState,
    ctx: &AuthContext,
    owner: UserId,
) -> Result<AuthorizationSource, GuardError> {
    if ctx.identity.is_subject(owner) {
        return Ok(AuthorizationSource::TokenClaim);
    }
    if ctx.identity.is_admin() {
        return Ok(AuthorizationSource::TokenClaim);
    }

    match state
        .identity()
        .is_admin(ctx.identity.subject_id, &ctx.token)
        .await
    {
        Ok(true) => Ok(AuthorizationSource::Remote),
        Ok(false) => Err(GuardError::forbidden(
            "caller is neither resource owner nor admin",
            "NOT_RESOURCE_OWNER",
        )),
        Err(err) if err.is_unavailable() => {
            // Both token fallbacks (owner-by-token-id, admin-by-token) were
            // checked above and failed; without the remote authority there is
            // no basis for a grant.
            tracing::warn!(
                subject = %ctx.identity.subject_id,
                owner = %owner,
                error = %err,
                "identity service unreachable, cannot authorize non-owner"
            );
            Err(GuardError::Unavailable)
        }
        Err(err) => {
            tracing::info!(subject = %ctx.identity.subject_id, error = %err, "ownership check rejected");
            Err(GuardError::forbidden(
                "caller is neither resource owner nor admin",
                "NOT_RESOURCE_OWNER",
            ))
        }
    }
}
