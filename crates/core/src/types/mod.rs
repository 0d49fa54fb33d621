//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod profile;
pub mod theme;

pub use cart::{CartEntry, CartSummary};
pub use email::{Email, EmailError};
pub use id::{ProductId, UserId};
pub use price::{Price, PriceError, format_amount};
pub use product::{Product, ProductDraft, ProductForm, ProductFormError};
pub use profile::Profile;
pub use theme::{Theme, UnknownTheme};
