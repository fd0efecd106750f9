//! Local bearer-token verification.
//!
//! Verifies token signature and validity window locally, without consulting
//! the identity service. The authentication middleware performs this check
//! first; remote reconciliation happens afterwards and takes precedence.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orchard_core::{Identity, Role, UserId, VerifiedBy};

/// Errors from local token verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature invalid, structure unparseable, or wrong algorithm.
    #[error("token malformed")]
    Malformed,

    /// The token's expiry is in the past.
    #[error("token expired")]
    Expired,

    /// The token's not-before time is in the future.
    #[error("token not yet active")]
    NotYetActive,

    /// Structurally valid token missing a usable subject claim.
    #[error("token claims invalid: {0}")]
    InvalidClaims(String),
}

/// Token claims carried by Orchard bearer tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID.
    pub sub: String,
    /// Role claimed for the subject.
    #[serde(default)]
    pub role: Role,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
    /// Not-before (Unix seconds), optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

/// Verifies bearer tokens against the shared signing secret.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for HS256 tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        // Subject presence is checked explicitly so the error can carry a
        // claims-specific code rather than a generic decode failure.
        validation.required_spec_claims.clear();
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify signature and validity window, returning the locally decoded
    /// identity tagged [`VerifiedBy::LocalFallback`].
    ///
    /// The caller decides whether the tag survives: remote reconciliation
    /// replaces the whole identity on success.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] describing exactly why verification failed.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => TokenError::NotYetActive,
                _ => TokenError::Malformed,
            })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(TokenError::InvalidClaims("subject missing".to_string()));
        }
        let subject_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenError::InvalidClaims(format!("subject not a UUID: {}", claims.sub)))?;

        Ok(Identity {
            subject_id,
            role: claims.role,
            issued_at: timestamp(claims.iat),
            expires_at: timestamp(claims.exp),
            verified_by: VerifiedBy::LocalFallback,
        })
    }
}

/// Sign a token for the given claims. Used by operator tooling and tests;
/// production tokens are minted by the identity service with the same secret.
///
/// # Errors
///
/// Returns an error if HMAC signing fails (practically never for HS256).
pub fn issue_token(secret: &SecretString, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
}

/// Convert Unix seconds to a UTC timestamp, clamping out-of-range values.
fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
