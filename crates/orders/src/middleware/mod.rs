//! Request middleware: authentication and authorization.
//!
//! # Request flow
//!
//! 1. [`auth::RequireAuth`] resolves the bearer token to an [`orchard_core::Identity`]
//!    (local verify, then remote reconcile with fallback).
//! 2. [`guards`] decide whether that identity may act on the addressed
//!    resource (`ensure_admin`, `ensure_resource_owner`, `ensure_user_exists`).
//! 3. The handler executes the domain operation.

pub mod auth;
pub mod guards;

pub use auth::{AuthContext, AuthRejection, RequireAuth};
pub use guards::{
    AuthorizationSource, GuardError, ensure_admin, ensure_resource_owner, ensure_user_exists,
};
