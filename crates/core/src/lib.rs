//! Cornershop Core - Shared types library.
//!
//! This crate provides common types used across all Cornershop components:
//! - `storefront` - Cart service and its HTTP surface
//! - `cli` - Command-line tools for migrations and cart maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Cart arithmetic and the one-line-per-product
//! invariant live here so every consumer agrees on them.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, shopper identity, cart lines and snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
