//! Per-request authenticated identity.
//!
//! An [`Identity`] is derived from a bearer token at the start of a request
//! and attached to the request context. It is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::Role;

/// How an identity was established.
///
/// Authorization decisions downstream may depend on this: an identity that was
/// only verified locally (because the identity service was unreachable) is
/// trusted for self-access but not for privilege escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifiedBy {
    /// The identity service confirmed the token.
    Remote,
    /// The identity service was unreachable; local signature and expiry
    /// checks passed and the token's own claims were adopted.
    LocalFallback,
}

/// The authenticated identity for one request.
///
/// Derived from bearer token claims, optionally reconciled against the
/// identity service. Request-scoped; never written to a collection file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The authenticated user.
    pub subject_id: UserId,
    /// Role claimed by the token or returned by the identity service.
    pub role: Role,
    /// When the credential was issued.
    pub issued_at: DateTime<Utc>,
    /// When the credential expires.
    pub expires_at: DateTime<Utc>,
    /// How this identity was established.
    pub verified_by: VerifiedBy,
}

impl Identity {
    /// Whether this identity claims administrative privilege.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this identity is the given user.
    #[must_use]
    pub fn is_subject(&self, user_id: UserId) -> bool {
        self.subject_id == user_id
    }
}
