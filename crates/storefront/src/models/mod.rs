//! Domain models for the storefront client.

pub mod session;

pub use session::{Session, SessionUser, UserMetadata, keys};
