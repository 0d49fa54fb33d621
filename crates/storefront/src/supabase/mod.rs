//! Supabase auth (GoTrue) and data (PostgREST) clients.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against `/auth/v1` and `/rest/v1`
//! - The backend is the source of truth for products, profiles and the
//!   per-user cart table; row-level policies decide what a token may touch
//! - Every request carries the project's anon key as `apikey`; data requests
//!   add the signed-in user's access token as the bearer (anon key otherwise)
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase, config.http_timeout)?;
//!
//! let session = client.sign_in_with_password(&email, "hunter22").await?;
//! let products = client.rest(Some(&session)).select_products().await?;
//! ```

mod auth;
mod rest;
pub mod types;

pub use auth::SignUpOutcome;
pub use rest::RestClient;
pub use types::{CartRow, RemoteCartRow};

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;
use crate::models::Session;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl SupabaseError {
    /// The HTTP status, when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// The message meant for the person who triggered the request.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// SupabaseClient
// =============================================================================

/// Client for a Supabase project.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    auth_url: Url,
    rest_url: Url,
    anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("auth_url", &self.inner.auth_url.as_str())
            .field("rest_url", &self.inner.rest_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the endpoint
    /// URLs cannot be derived from the project URL.
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self, SupabaseError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                auth_url: config.url.join("auth/v1/")?,
                rest_url: config.url.join("rest/v1/")?,
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    /// Data API handle authorized as `session`'s user, or anonymously.
    #[must_use]
    pub fn rest<'a>(&'a self, session: Option<&'a Session>) -> RestClient<'a> {
        RestClient::new(self, session.map(|s| &s.access_token))
    }

    fn auth_endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(self.inner.auth_url.join(path)?)
    }

    fn rest_endpoint(&self, table: &str) -> Result<Url, SupabaseError> {
        Ok(self.inner.rest_url.join(table)?)
    }

    /// Attach the `apikey` header and a bearer token.
    fn authorize(&self, request: RequestBuilder, bearer: Option<&SecretString>) -> RequestBuilder {
        let bearer = bearer.unwrap_or(&self.inner.anon_key);
        request
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }

    /// Send a request and decode its JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SupabaseError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse Supabase response"
            );
            SupabaseError::Parse(e)
        })
    }

    /// Send a request whose body, if any, is not needed.
    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), SupabaseError> {
        self.send(request).await.map(drop)
    }

    /// Send a request, mapping non-success statuses to errors.
    async fn send(&self, request: RequestBuilder) -> Result<String, SupabaseError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SupabaseError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Supabase returned non-success status"
            );
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message: extract_error_message(status, &body),
            });
        }

        Ok(body)
    }
}

/// Pull a human-readable message out of a GoTrue or PostgREST error body.
///
/// PostgREST uses `message`; GoTrue uses `error_description`, `msg` or
/// `error` depending on the endpoint and version.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();

    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        })
        .filter(|message| !message.is_empty())
        .map_or_else(
            || {
                let text = body.trim();
                if text.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    text.chars().take(200).collect()
                }
            },
            str::to_string,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_postgrest_message() {
        let body = r#"{"code":"42501","details":null,"hint":null,"message":"new row violates row-level security policy for table \"products\""}"#;
        assert_eq!(
            extract_error_message(StatusCode::FORBIDDEN, body),
            "new row violates row-level security policy for table \"products\""
        );
    }

    #[test]
    fn test_extract_gotrue_messages() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, body),
            "Invalid login credentials"
        );

        let body = r#"{"code":422,"msg":"User already registered"}"#;
        assert_eq!(
            extract_error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "User already registered"
        );
    }

    #[test]
    fn test_extract_falls_back_to_body_or_reason() {
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            extract_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }

    #[test]
    fn test_error_display_and_status() {
        let err = SupabaseError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid login credentials (HTTP 400)");
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(err.status(), Some(400));
        assert_eq!(SupabaseError::RateLimited(30).status(), Some(429));
    }
}
