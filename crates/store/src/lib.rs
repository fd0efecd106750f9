//! Orchard Store - File-backed JSON document store.
//!
//! Each logical collection (orders, carts, products, payments) is one JSON
//! file on disk with the shape:
//!
//! ```json
//! { "schemaVersion": "1.0", "<collectionName>": [ ...documents ] }
//! ```
//!
//! [`FileStore`] owns the read/validate/repair/write cycle for one such file:
//!
//! - **Atomic replace**: writes go to a `.tmp` sibling which is renamed over
//!   the target, so readers never observe a half-written file.
//! - **Single-writer**: read-modify-write cycles are serialized by a per-store
//!   async mutex. This is safe within one running process only; there is no
//!   cross-process locking.
//! - **Self-healing**: a missing, corrupt, or structurally invalid file is
//!   replaced with an empty default before any caller can observe bad state.
//!
//! There is no cross-collection transaction: two stores are independent
//! critical sections.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod error;
mod file_store;

pub use error::StoreError;
pub use file_store::{Collection, Document, FileStore, SCHEMA_VERSION};
