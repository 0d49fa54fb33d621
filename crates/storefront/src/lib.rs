//! Vitrine storefront library.
//!
//! A client for a Supabase-backed shop: catalog, cart, accounts and product
//! management. Front-ends create an [`AppState`] and drive it through its
//! operations.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod models;
pub mod products;
pub mod session;
pub mod state;
pub mod storage;
pub mod supabase;
pub mod sync;
pub mod views;

pub use error::{AppError, Result};
pub use state::AppState;
