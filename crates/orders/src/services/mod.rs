//! Service clients and helpers.

pub mod identity;
pub mod token;
