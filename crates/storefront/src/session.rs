//! Session lifecycle: anonymous → authenticating → authenticated.
//!
//! [`SessionStore`] owns the current [`Session`], the loaded [`Profile`], the
//! derived admin flag and the status of the last auth attempt. Transitions
//! that change who is signed in are published as [`SessionEvent`]s on a
//! broadcast channel; listeners (profile loading, cart sync) subscribe to it
//! instead of being called inline.

use tokio::sync::broadcast;

use vitrine_core::{Profile, UserId};

use crate::models::Session;

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 16;

/// Where the session lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

/// A change of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A persisted session was restored at startup.
    Restored { user_id: UserId },
    /// A user signed in (or signed up with auto-confirmation).
    SignedIn { user_id: UserId },
    /// The session ended.
    SignedOut { user_id: UserId },
}

impl SessionEvent {
    /// The user the event is about.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::Restored { user_id } | Self::SignedIn { user_id } | Self::SignedOut { user_id } => {
                *user_id
            }
        }
    }

    /// Whether the event establishes a session.
    #[must_use]
    pub const fn is_established(&self) -> bool {
        matches!(self, Self::Restored { .. } | Self::SignedIn { .. })
    }
}

/// Which auth action is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    SignIn,
    SignUp,
    SignOut,
}

/// Session state, profile and auth-attempt status.
#[derive(Debug)]
pub struct SessionStore {
    state: SessionState,
    session: Option<Session>,
    profile: Option<Profile>,
    is_admin: bool,
    loading: bool,
    message: Option<String>,
    error: Option<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: SessionState::Anonymous,
            session: None,
            profile: None,
            is_admin: false,
            loading: false,
            message: None,
            error: None,
            events,
        }
    }

    /// Subscribe to session events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(Session::user_id)
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Whether an auth attempt is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Outcome message of the last successful attempt.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Error of the last failed attempt.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Name to greet the user with: profile username, then the username
    /// given at sign-up, then the email.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let session = self.session.as_ref()?;
        self.profile
            .as_ref()
            .map(|p| p.username.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| session.user.user_metadata.username.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| self.email())
    }

    /// Profile email, falling back to the session's.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.profile
            .as_ref()
            .map(|p| p.email.clone())
            .filter(|email| !email.is_empty())
            .or_else(|| self.session.as_ref().and_then(|s| s.user.email.clone()))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Start an auth attempt, clearing the previous outcome.
    pub fn begin(&mut self, attempt: Attempt) {
        self.loading = true;
        self.message = None;
        self.error = None;
        if matches!(attempt, Attempt::SignIn | Attempt::SignUp) && self.session.is_none() {
            self.state = SessionState::Authenticating;
        }
    }

    /// Install a session and publish the event describing how it arrived.
    pub fn establish(&mut self, session: Session, restored: bool) {
        let user_id = session.user_id();
        let switched_user = self.user_id().is_some_and(|current| current != user_id);
        if switched_user {
            self.profile = None;
            self.is_admin = false;
        }

        self.session = Some(session);
        self.state = SessionState::Authenticated;

        let event = if restored {
            SessionEvent::Restored { user_id }
        } else {
            SessionEvent::SignedIn { user_id }
        };
        self.publish(event);
    }

    /// Finish an attempt successfully with a message for the user.
    pub fn succeed(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.message = Some(message.into());
        if self.session.is_none() {
            self.state = SessionState::Anonymous;
        }
    }

    /// Finish an attempt with an error; the previous identity stays.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.loading = false;
        self.error = Some(error.into());
        self.state = if self.session.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
    }

    /// Drop the session and profile and publish `SignedOut`.
    pub fn clear(&mut self) {
        self.profile = None;
        self.is_admin = false;
        self.state = SessionState::Anonymous;
        if let Some(session) = self.session.take() {
            self.publish(SessionEvent::SignedOut {
                user_id: session.user_id(),
            });
        }
    }

    /// Record the profile loaded for the current user.
    ///
    /// Ignored when it belongs to someone else (a stale load).
    pub fn set_profile(&mut self, profile: Profile) {
        if self.user_id() != Some(profile.id) {
            tracing::debug!(profile_id = %profile.id, "Discarding profile for another user");
            return;
        }
        self.is_admin = profile.admin;
        self.profile = Some(profile);
    }

    /// Forget the loaded profile.
    pub fn clear_profile(&mut self) {
        self.profile = None;
        self.is_admin = false;
    }

    fn publish(&self, event: SessionEvent) {
        tracing::debug!(?event, "Session event");
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;
    use uuid::Uuid;

    use super::*;

    fn session(username: Option<&str>) -> Session {
        serde_json::from_value(json!({
            "access_token": "a",
            "refresh_token": "r",
            "user": {
                "id": Uuid::new_v4(),
                "email": "buyer@example.com",
                "user_metadata": { "username": username, "admin": false }
            }
        }))
        .unwrap()
    }

    fn profile(id: UserId, username: &str, admin: bool) -> Profile {
        Profile {
            id,
            email: "profile@example.com".to_string(),
            username: username.to_string(),
            admin,
        }
    }

    #[test]
    fn test_sign_in_transitions_and_events() {
        let mut store = SessionStore::new();
        let mut events = store.subscribe();

        store.begin(Attempt::SignIn);
        assert_eq!(store.state(), SessionState::Authenticating);
        assert!(store.is_loading());

        let session = session(None);
        let user_id = session.user_id();
        store.establish(session, false);
        store.succeed("Sign in successful!");

        assert_eq!(store.state(), SessionState::Authenticated);
        assert!(!store.is_loading());
        assert_eq!(store.message(), Some("Sign in successful!"));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn { user_id });
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_failure_returns_to_anonymous_and_next_attempt_clears_error() {
        let mut store = SessionStore::new();

        store.begin(Attempt::SignIn);
        store.fail("Invalid login credentials");
        assert_eq!(store.state(), SessionState::Anonymous);
        assert_eq!(store.error(), Some("Invalid login credentials"));

        store.begin(Attempt::SignIn);
        assert!(store.error().is_none());
        assert!(store.message().is_none());
    }

    #[test]
    fn test_sign_out_clears_profile_and_publishes() {
        let mut store = SessionStore::new();
        let session = session(None);
        let user_id = session.user_id();
        store.establish(session, true);
        store.set_profile(profile(user_id, "ana", true));
        assert!(store.is_admin());

        let mut events = store.subscribe();
        store.clear();

        assert_eq!(store.state(), SessionState::Anonymous);
        assert!(store.current().is_none());
        assert!(store.profile().is_none());
        assert!(!store.is_admin());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut { user_id });
    }

    #[test]
    fn test_restored_event() {
        let mut store = SessionStore::new();
        let mut events = store.subscribe();
        let session = session(None);
        let user_id = session.user_id();

        store.establish(session, true);
        let event = events.try_recv().unwrap();
        assert_eq!(event, SessionEvent::Restored { user_id });
        assert!(event.is_established());
    }

    #[test]
    fn test_stale_profile_is_ignored() {
        let mut store = SessionStore::new();
        store.establish(session(None), false);

        store.set_profile(profile(UserId::new(Uuid::new_v4()), "other", true));
        assert!(store.profile().is_none());
        assert!(!store.is_admin());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut store = SessionStore::new();
        assert!(store.display_name().is_none());

        let session = session(Some("meta-name"));
        let user_id = session.user_id();
        store.establish(session, false);
        assert_eq!(store.display_name().as_deref(), Some("meta-name"));

        store.set_profile(profile(user_id, "profile-name", false));
        assert_eq!(store.display_name().as_deref(), Some("profile-name"));
        assert_eq!(store.email().as_deref(), Some("profile@example.com"));

        let mut bare = SessionStore::new();
        bare.establish(self::session(None), false);
        assert_eq!(bare.display_name().as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn test_sign_up_without_session_ends_anonymous() {
        let mut store = SessionStore::new();
        store.begin(Attempt::SignUp);
        store.succeed("Registration successful!");
        assert_eq!(store.state(), SessionState::Anonymous);
    }
}
