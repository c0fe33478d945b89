//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Access token verification against the hosted auth service

pub mod auth;
