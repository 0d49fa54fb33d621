//! Vitrine Core - Shared domain types.
//!
//! This crate provides the types used across all Vitrine components:
//! - `storefront` - Client library (stores, Supabase client, cart sync)
//! - `cli` - Terminal front-end driving the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and parsing - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Ids, prices, emails, products, cart entries, profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
