//! Orchard Core - Shared types library.
//!
//! This crate provides common types used across all Orchard components:
//! - `store` - File-backed JSON document store
//! - `orders` - Order management service (orders, carts, products, payments)
//! - `integration-tests` - End-to-end test harness
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no file access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, statuses, roles,
//!   and the per-request authenticated identity

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
