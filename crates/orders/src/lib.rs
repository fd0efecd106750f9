//! Orchard Orders library.
//!
//! This crate provides the order management service as a library, allowing it
//! to be tested end-to-end and reused by the integration-test harness.
//!
//! # Architecture
//!
//! - Axum web framework with JSON request/response bodies
//! - Bearer-token authentication reconciled against the remote identity
//!   service, with a local fallback when that service is unreachable
//! - One file-backed JSON collection per model (orders, carts, products,
//!   payments) via `orchard_store::FileStore`
//!
//! The identity service is an external collaborator: this crate never stores
//! users locally, it only verifies tokens against the identity service and
//! falls back to locally verified claims when it is down.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
