//! Shared utilities: IP helpers and resolved topology validation.

pub mod ip_utils;
pub mod validation;

pub use validation::{interfaces_by_router, validate_resolved_topology};
