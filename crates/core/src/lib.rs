//! Librería Core - Shared types library.
//!
//! This crate provides common types used across all Librería components:
//! - `storefront` - Public storefront plus the admin/employee consoles
//! - `cli` - Command-line tools for seeding the remote collections
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! collection gateway access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, roles,
//!   and reservation statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
