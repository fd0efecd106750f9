//! Identity service error types.

use thiserror::Error;

/// Errors from identity service calls.
///
/// Network-class failures (`ServiceUnavailable`, `Timeout`) are what the
/// authentication and authorization fallback policies key off; semantic
/// rejections (`Rejected`, `NotFound`) are terminal and never trigger a
/// fallback.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Connection refused/reset, DNS failure, or repeated 5xx/429 responses.
    #[error("identity service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The request exceeded the fixed per-call timeout.
    #[error("identity service request timed out")]
    Timeout,

    /// The identity service explicitly rejected the credential (401/403).
    #[error("credential rejected by identity service")]
    Rejected,

    /// The addressed user does not exist (404).
    #[error("user not found in identity service")]
    NotFound,

    /// The identity service answered with a body we could not interpret.
    #[error("unexpected identity service response: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    /// Whether this error means the remote authority could not be reached.
    ///
    /// Fallback policies apply only in this case. A malformed success body
    /// counts too: the remote gave no usable verdict either way.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::Timeout | Self::InvalidResponse(_)
        )
    }

    /// Whether the remote gave an explicit negative verdict.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected | Self::NotFound)
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::ServiceUnavailable(err.to_string())
        }
    }
}
