//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod product;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use product::ProductSnapshot;
pub use role::{Role, RoleParseError};
