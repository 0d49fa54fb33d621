//! Application state owned by a front-end.
//!
//! [`AppState`] owns the backend client, local storage, and the session,
//! catalog and cart stores. Front-ends read through its accessors and change
//! things only through its operations. Operations take `&mut self`, so one
//! runs at a time; each awaits its backend calls before returning.
//!
//! Session transitions are published as [`SessionEvent`]s. After every
//! operation the state drains its own subscription and hands each event to
//! the profile loader and the cart sync.

use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, instrument, warn};

use vitrine_core::{Email, Product, ProductDraft, ProductId, Profile, Theme};

use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::error::{self, AppError, Result};
use crate::models::{Session, UserMetadata, keys};
use crate::products::ProductStore;
use crate::session::{Attempt, SessionEvent, SessionStore};
use crate::storage::{self, FileStorage, LocalStorage};
use crate::supabase::{SignUpOutcome, SupabaseClient, SupabaseError};
use crate::sync::{CartSync, SyncOutcome};

pub const SIGN_IN_MESSAGE: &str = "Sign in successful!";
pub const SIGN_UP_MESSAGE: &str = "Registration successful!";
pub const SIGN_UP_CONFIRM_MESSAGE: &str =
    "Registration successful! Check your email to confirm your account.";
pub const SIGN_OUT_MESSAGE: &str = "Signed out.";

/// Everything a storefront front-end works with.
pub struct AppState {
    client: SupabaseClient,
    storage: Box<dyn LocalStorage>,
    session: SessionStore,
    products: ProductStore,
    cart: CartStore,
    theme: Theme,
    events: broadcast::Receiver<SessionEvent>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("client", &self.client)
            .field("session", &self.session.state())
            .field("products", &self.products.all().len())
            .field("cart", &self.cart.entries().len())
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create the state, reading the cart snapshot and theme from `storage`.
    ///
    /// The persisted session is not touched until [`Self::restore_session`].
    pub fn new(client: SupabaseClient, storage: impl LocalStorage + 'static) -> Self {
        let storage: Box<dyn LocalStorage> = Box::new(storage);
        let session = SessionStore::new();
        let events = session.subscribe();
        let cart = CartStore::load(storage.as_ref());
        let theme = storage::load_parsed(storage.as_ref(), keys::THEME).unwrap_or_default();

        Self {
            client,
            storage,
            session,
            products: ProductStore::new(),
            cart,
            theme,
            events,
        }
    }

    /// Create the state from configuration, with file storage in the data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn from_config(config: &StorefrontConfig) -> std::result::Result<Self, SupabaseError> {
        let client = SupabaseClient::new(&config.supabase, config.http_timeout)?;
        Ok(Self::new(client, FileStorage::new(&config.data_dir)))
    }

    /// Restore the persisted session, then load the catalog.
    pub async fn initialize(&mut self) {
        self.restore_session().await;
        self.load_products().await;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn client(&self) -> &SupabaseClient {
        &self.client
    }

    #[must_use]
    pub fn storage(&self) -> &dyn LocalStorage {
        self.storage.as_ref()
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub const fn products(&self) -> &ProductStore {
        &self.products
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// Subscribe to session events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Restore the session persisted by an earlier run.
    ///
    /// An expired session is refreshed first; if that fails the stored
    /// session is discarded and the state stays anonymous.
    #[instrument(skip(self))]
    pub async fn restore_session(&mut self) {
        let Some(stored) = storage::load_json::<Session>(self.storage(), keys::SESSION) else {
            debug!("No stored session");
            return;
        };

        let session = if stored.is_expired_at(Utc::now()) {
            match self.client.refresh_session(&stored.refresh_token).await {
                Ok(fresh) => {
                    storage::save_json(self.storage(), keys::SESSION, &fresh);
                    fresh
                }
                Err(e) => {
                    warn!(error = %e, "Stored session could not be refreshed; discarding it");
                    storage::remove(self.storage(), keys::SESSION);
                    return;
                }
            }
        } else {
            stored
        };

        info!(user_id = %session.user_id(), "Session restored");
        self.session.establish(session, true);
        self.dispatch_events().await;
    }

    /// Register a new account.
    ///
    /// Stores `{username, admin: false}` as user metadata and upserts the
    /// matching profile row; a failed upsert is ignored. The user is signed
    /// in only if the provider returns a session right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed or the provider rejects the
    /// registration. The error text is also recorded on the session store.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&mut self, email: &str, password: &SecretString, username: &str) -> Result<()> {
        self.session.begin(Attempt::SignUp);

        let result = self.register(email, password, username).await;
        match result {
            Ok(outcome) => {
                let message = match outcome {
                    SignUpOutcome::SignedIn(session) => {
                        storage::save_json(self.storage(), keys::SESSION, &session);
                        self.session.establish(session, false);
                        self.dispatch_events().await;
                        SIGN_UP_MESSAGE
                    }
                    SignUpOutcome::ConfirmationRequired(_) => SIGN_UP_CONFIRM_MESSAGE,
                };
                self.session.succeed(message);
                Ok(())
            }
            Err(e) => Err(self.fail_attempt(e)),
        }
    }

    async fn register(
        &self,
        email: &str,
        password: &SecretString,
        username: &str,
    ) -> Result<SignUpOutcome> {
        let email = Email::parse(email)?;
        let metadata = UserMetadata {
            username: Some(username.to_string()),
            admin: false,
        };
        let outcome = self.client.sign_up(&email, password, &metadata).await?;

        let profile = Profile {
            id: outcome.user().id,
            email: email.to_string(),
            username: username.to_string(),
            admin: false,
        };
        let bearer = match &outcome {
            SignUpOutcome::SignedIn(session) => Some(session),
            SignUpOutcome::ConfirmationRequired(_) => None,
        };
        if let Err(e) = self.client.rest(bearer).upsert_profile(&profile).await {
            debug!(error = %e, "Profile upsert after sign-up failed");
        }

        Ok(outcome)
    }

    /// Sign in with email and password.
    ///
    /// On success the session is persisted, the profile is loaded and the
    /// cart is reconciled with the account before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed or the credentials are
    /// rejected. The error text is also recorded on the session store.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&mut self, email: &str, password: &SecretString) -> Result<()> {
        self.session.begin(Attempt::SignIn);

        let result = match Email::parse(email) {
            Ok(email) => self
                .client
                .sign_in_with_password(&email, password)
                .await
                .map_err(AppError::from),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(session) => {
                storage::save_json(self.storage(), keys::SESSION, &session);
                self.session.establish(session, false);
                self.dispatch_events().await;
                self.session.succeed(SIGN_IN_MESSAGE);
                error::add_breadcrumb("auth", "Signed in", None);
                Ok(())
            }
            Err(e) => Err(self.fail_attempt(e)),
        }
    }

    /// Sign out and forget the persisted session.
    ///
    /// The local cart is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the sign-out; the session is
    /// kept in that case.
    #[instrument(skip(self))]
    pub async fn sign_out(&mut self) -> Result<()> {
        self.session.begin(Attempt::SignOut);

        if let Some(session) = self.session.current() {
            if let Err(e) = self.client.sign_out(session).await {
                return Err(self.fail_attempt(e.into()));
            }
        }

        storage::remove(self.storage(), keys::SESSION);
        self.session.clear();
        self.dispatch_events().await;
        self.session.succeed(SIGN_OUT_MESSAGE);
        Ok(())
    }

    fn fail_attempt(&mut self, err: AppError) -> AppError {
        err.capture();
        self.session.fail(err.user_message());
        err
    }

    // =========================================================================
    // Session event listeners
    // =========================================================================

    /// Hand every pending session event to the listeners.
    pub async fn dispatch_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(&event).await,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    async fn handle_event(&mut self, event: &SessionEvent) {
        if !event.is_established() {
            error::clear_sentry_user();
            return;
        }
        // A later event already replaced this user.
        if self.session.user_id() != Some(event.user_id()) {
            return;
        }
        self.load_profile().await;
        self.sync_on_session_established().await;
    }

    /// Fetch the signed-in user's profile; failure leaves no profile and no
    /// admin rights.
    async fn load_profile(&mut self) {
        let Some(session) = self.session.current() else {
            return;
        };
        let user_id = session.user_id();

        let result = self.client.rest(Some(session)).fetch_profile(user_id).await;
        match result {
            Ok(profile) => {
                debug!(%user_id, admin = profile.admin, "Profile loaded");
                self.session.set_profile(profile);
            }
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to load profile");
                self.session.clear_profile();
            }
        }

        let email = self.session.email();
        error::set_sentry_user(&user_id, email.as_deref());
    }

    async fn sync_on_session_established(&mut self) -> Option<SyncOutcome> {
        let session = self.session.current()?;
        let sync = CartSync::new(&self.client, session);
        Some(
            sync.on_session_established(&mut self.cart, self.storage.as_ref())
                .await,
        )
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add one unit of `product` to the cart.
    pub async fn add_to_cart(&mut self, product: Product) {
        error::add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product.id.as_str())]));
        self.cart.add(product);
        self.cart_changed().await;
    }

    /// Remove a product from the cart; nothing happens if it is absent.
    pub async fn remove_from_cart(&mut self, id: &ProductId) {
        if self.cart.remove(id) {
            self.cart_changed().await;
        }
    }

    /// Set a cart entry's quantity verbatim; values below 1 are not rejected
    /// here.
    pub async fn update_qty_cart(&mut self, id: &ProductId, quantity: i32) {
        if self.cart.set_quantity(id, quantity) {
            self.cart_changed().await;
        }
    }

    /// Empty the cart.
    pub async fn clear_cart(&mut self) {
        self.cart.clear();
        self.cart_changed().await;
    }

    /// Persist the cart and, when signed in, overwrite the remote copy.
    async fn cart_changed(&mut self) -> Option<SyncOutcome> {
        self.cart.persist(self.storage.as_ref());

        let session = self.session.current()?;
        Some(CartSync::new(&self.client, session).push(self.cart.entries()).await)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Load the whole catalog, replacing what is held.
    ///
    /// Failure is recorded on the product store, not returned.
    #[instrument(skip(self))]
    pub async fn load_products(&mut self) {
        match self.client.rest(self.session.current()).select_products().await {
            Ok(products) => {
                info!(count = products.len(), "Catalog loaded");
                self.products.replace(products);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load catalog");
                self.products
                    .fail(format!("Fetching products failed! {}", e.message()));
            }
        }
    }

    /// Insert a product and append the stored row(s) to the catalog.
    ///
    /// Not gated on admin rights; the admin panel view hides this from
    /// everyone else.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert.
    #[instrument(skip_all, fields(title = %draft.title))]
    pub async fn add_product_to_db(&mut self, draft: &ProductDraft) -> Result<Vec<Product>> {
        let rows = self
            .client
            .rest(self.session.current())
            .insert_product(draft)
            .await
            .map_err(report)?;

        self.products.append(rows.iter().cloned());
        Ok(rows)
    }

    /// Update a product and replace the catalog entry with the first
    /// returned row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn update_product_in_db(
        &mut self,
        id: &ProductId,
        updates: &ProductDraft,
    ) -> Result<Vec<Product>> {
        let rows = self
            .client
            .rest(self.session.current())
            .update_product(id, updates)
            .await
            .map_err(report)?;

        match rows.first() {
            Some(updated) => {
                self.products.replace_by_id(id, updated.clone());
            }
            None => warn!("Update matched no rows"),
        }
        Ok(rows)
    }

    /// Delete a product and drop it from the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn delete_product_from_db(&mut self, id: &ProductId) -> Result<()> {
        self.client
            .rest(self.session.current())
            .delete_product(id)
            .await
            .map_err(report)?;

        self.products.remove(id);
        Ok(())
    }

    // =========================================================================
    // Theme
    // =========================================================================

    /// Switch between light and dark, persisting the choice.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        storage::save_raw(self.storage(), keys::THEME, self.theme.as_str());
        self.theme
    }
}

fn report(err: SupabaseError) -> AppError {
    let err = AppError::from(err);
    err.capture();
    err
}
