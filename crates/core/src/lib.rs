//! Shopfront Core - Shared types library.
//!
//! This crate provides the value types shared by the Shopfront crates:
//! - `state` - Session, cart and route-gate stores
//! - `cli` - Command-line tool for inspecting and driving persisted state
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it usable from both native and browser builds.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles and product snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
