//! GoTrue endpoints: sign-up, password sign-in, refresh, sign-out.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use vitrine_core::Email;

use super::{SupabaseClient, SupabaseError};
use crate::models::{Session, SessionUser, UserMetadata};

/// What the provider returned for a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled: the user is signed in right away.
    SignedIn(Session),
    /// The account exists but must be confirmed by email first.
    ConfirmationRequired(SessionUser),
}

impl SignUpOutcome {
    /// The user that was created.
    #[must_use]
    pub const fn user(&self) -> &SessionUser {
        match self {
            Self::SignedIn(session) => &session.user,
            Self::ConfirmationRequired(user) => user,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(SessionUser),
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a UserMetadata,
}

impl SupabaseClient {
    /// Register a new user with email and password.
    ///
    /// `metadata` is stored on the auth user (`user_metadata`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects the
    /// registration (e.g., already registered, weak password).
    #[instrument(skip(self, password, metadata), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: &UserMetadata,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let body = SignUpRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            data: metadata,
        };

        let request = self
            .inner
            .client
            .post(self.auth_endpoint("signup")?)
            .json(&body);
        let response: SignUpResponse = self.execute(self.authorize(request, None)).await?;

        debug!("Sign-up accepted");
        Ok(match response {
            SignUpResponse::Session(session) => {
                SignUpOutcome::SignedIn(session.with_computed_expiry(Utc::now()))
            }
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user),
        })
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credentials are rejected.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, SupabaseError> {
        let mut url = self.auth_endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let request = self.inner.client.post(url).json(&json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        }));
        let session: Session = self.execute(self.authorize(request, None)).await?;

        debug!(user_id = %session.user_id(), "Signed in");
        Ok(session.with_computed_expiry(Utc::now()))
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the refresh token is no
    /// longer valid.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &SecretString) -> Result<Session, SupabaseError> {
        let mut url = self.auth_endpoint("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let request = self.inner.client.post(url).json(&json!({
            "refresh_token": refresh_token.expose_secret(),
        }));
        let session: Session = self.execute(self.authorize(request, None)).await?;

        debug!(user_id = %session.user_id(), "Session refreshed");
        Ok(session.with_computed_expiry(Utc::now()))
    }

    /// Revoke the session's tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    #[instrument(skip_all, fields(user_id = %session.user_id()))]
    pub async fn sign_out(&self, session: &Session) -> Result<(), SupabaseError> {
        let request = self.inner.client.post(self.auth_endpoint("logout")?);
        self.execute_empty(self.authorize(request, Some(&session.access_token)))
            .await
    }
}
