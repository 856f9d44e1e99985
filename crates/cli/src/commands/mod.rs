//! CLI command implementations.

pub mod cart;
pub mod gate;
pub mod session;
