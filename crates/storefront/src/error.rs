//! Unified error handling with Sentry integration.
//!
//! User-initiated operations (auth, product management) return
//! `Result<T, AppError>`; front-ends show [`AppError::user_message`] as a
//! blocking alert. Background work (cart sync, local storage) never produces
//! an `AppError`.

use thiserror::Error;

use vitrine_core::{EmailError, ProductFormError};

use crate::supabase::SupabaseError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend request failed or was rejected.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Email failed validation before any request was made.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Product form failed validation.
    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductFormError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation needs a signed-in user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad input from the caller.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Message to show the person who triggered the operation.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Supabase(err) => match err {
                SupabaseError::Api { message, .. } => message.clone(),
                SupabaseError::RateLimited(secs) => {
                    format!("Too many requests, try again in {secs} seconds")
                }
                SupabaseError::Http(_) => "Could not reach the server".to_string(),
                SupabaseError::Parse(_) | SupabaseError::Url(_) => {
                    "Unexpected response from the server".to_string()
                }
            },
            Self::InvalidEmail(err) => err.to_string(),
            Self::InvalidProduct(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Report unexpected failures to Sentry.
    ///
    /// Rejections the user can act on (bad credentials, validation) are not
    /// reported.
    pub fn capture(&self) {
        let unexpected = match self {
            Self::Supabase(err) => !matches!(err.status(), Some(400..=499)),
            _ => false,
        };
        if unexpected {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Operation failed");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after a session is established to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
