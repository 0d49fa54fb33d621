//! Session-related types.
//!
//! A [`Session`] is what the auth provider returns on sign-in and refresh. It
//! is persisted under [`keys::SESSION`] so a later start can restore it.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use vitrine_core::UserId;

/// Seconds before expiry at which a stored session is treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// An authenticated session issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for data requests.
    #[serde(serialize_with = "expose")]
    pub access_token: SecretString,
    /// Token used to obtain a new session once the access token expires.
    #[serde(serialize_with = "expose")]
    pub refresh_token: SecretString,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp at which the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

/// The user embedded in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Metadata supplied at sign-up.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Sign-up metadata stored with the auth user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

impl Session {
    /// The authenticated user's id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Whether the access token is expired (or about to be) at `now`.
    ///
    /// Sessions without an expiry never expire locally.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|ts| ts.saturating_sub(EXPIRY_MARGIN_SECS) <= now.timestamp())
    }

    /// Fill in `expires_at` from `expires_in` when the provider omitted it.
    #[must_use]
    pub fn with_computed_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now.timestamp().saturating_add(secs));
        }
        self
    }
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Local storage keys.
pub mod keys {
    /// Key for the JSON-encoded cart snapshot.
    pub const CART: &str = "cart";

    /// Key for the theme preference.
    pub const THEME: &str = "theme";

    /// Key for the persisted auth session.
    pub const SESSION: &str = "session";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn sample(expires_at: Option<i64>) -> Session {
        serde_json::from_value(json!({
            "access_token": "access-abc",
            "refresh_token": "refresh-def",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": expires_at,
            "user": {
                "id": Uuid::new_v4(),
                "email": "buyer@example.com",
                "user_metadata": { "username": "buyer", "admin": false },
                "aud": "authenticated"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_session_round_trips_tokens() {
        let session = sample(Some(1_700_000_000));
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["access_token"], json!("access-abc"));

        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back.access_token.expose_secret(), "access-abc");
        assert_eq!(back.refresh_token.expose_secret(), "refresh-def");
        assert_eq!(back.user, session.user);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug_output = format!("{:?}", sample(None));
        assert!(!debug_output.contains("access-abc"));
        assert!(!debug_output.contains("refresh-def"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let fresh = sample(Some(now.timestamp() + 3600));
        let stale = sample(Some(now.timestamp() - 1));
        let edge = sample(Some(now.timestamp() + 5));

        assert!(!fresh.is_expired_at(now));
        assert!(stale.is_expired_at(now));
        assert!(edge.is_expired_at(now));
        assert!(!sample(None).is_expired_at(now));
    }

    #[test]
    fn test_computed_expiry() {
        let now = Utc::now();
        let session = sample(None).with_computed_expiry(now);
        assert_eq!(session.expires_at, Some(now.timestamp() + 3600));
    }

    #[test]
    fn test_extreme_expiry_values_do_not_overflow() {
        let now = Utc::now();
        assert!(sample(Some(i64::MIN)).is_expired_at(now));
        assert!(!sample(Some(i64::MAX)).is_expired_at(now));

        let mut session = sample(None);
        session.expires_in = Some(i64::MAX);
        assert_eq!(session.with_computed_expiry(now).expires_at, Some(i64::MAX));
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let session: Session = serde_json::from_value(json!({
            "access_token": "a",
            "refresh_token": "r",
            "user": { "id": Uuid::new_v4() }
        }))
        .unwrap();
        assert_eq!(session.user.user_metadata, UserMetadata::default());
        assert!(session.user.email.is_none());
    }
}
