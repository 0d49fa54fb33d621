//! View-models for front-ends.
//!
//! These decide what a screen may show and which controls it offers. The
//! admin panel is the only place admin rights are checked; see
//! [`AdminPanel`].

use vitrine_core::{Product, ProductForm, ProductId, Theme};

use crate::error::Result;
use crate::state::AppState;

/// The admin screen for the current session.
///
/// Product-mutation controls exist only on [`AdminPanel::Manage`]. The
/// operations on [`AppState`] are not gated themselves.
#[derive(Debug)]
pub enum AdminPanel<'a> {
    /// Nobody is signed in.
    SignInRequired,
    /// Signed in without admin rights.
    AccessDenied,
    /// Signed in as an admin.
    Manage(ProductManager<'a>),
}

impl<'a> AdminPanel<'a> {
    /// Pick the admin screen for `state`'s current session.
    pub fn for_state(state: &'a mut AppState) -> Self {
        if state.session().current().is_none() {
            Self::SignInRequired
        } else if !state.session().is_admin() {
            Self::AccessDenied
        } else {
            Self::Manage(ProductManager { state })
        }
    }

    /// Whether the screen offers create/update/delete.
    #[must_use]
    pub const fn has_controls(&self) -> bool {
        matches!(self, Self::Manage(_))
    }

    /// Message shown instead of the controls.
    #[must_use]
    pub const fn notice(&self) -> Option<&'static str> {
        match self {
            Self::SignInRequired => Some("Please sign in to access the admin panel."),
            Self::AccessDenied => Some("Access denied. Admins only."),
            Self::Manage(_) => None,
        }
    }
}

/// Product management controls, only reachable through [`AdminPanel::Manage`].
#[derive(Debug)]
pub struct ProductManager<'a> {
    state: &'a mut AppState,
}

impl ProductManager<'_> {
    #[must_use]
    pub fn products(&self) -> &[Product] {
        self.state.products().all()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.products().is_loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.state.products().error()
    }

    /// Submit the "new product" form.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid or the backend rejects it.
    pub async fn create(&mut self, form: ProductForm) -> Result<Vec<Product>> {
        let draft = form.into_draft()?;
        self.state.add_product_to_db(&draft).await
    }

    /// Submit the edit form for product `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is invalid or the backend rejects it.
    pub async fn update(&mut self, id: &ProductId, form: ProductForm) -> Result<Vec<Product>> {
        let draft = form.into_draft()?;
        self.state.update_product_in_db(id, &draft).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    pub async fn delete(&mut self, id: &ProductId) -> Result<()> {
        self.state.delete_product_from_db(id).await
    }
}

/// The page header: greeting, cart badge and theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Name to greet, when signed in.
    pub welcome: Option<String>,
    pub is_admin: bool,
    pub cart_count: i64,
    pub cart_total: String,
    pub theme: Theme,
}

impl Header {
    #[must_use]
    pub fn of(state: &AppState) -> Self {
        let summary = state.cart().summary();
        Self {
            welcome: state.session().display_name(),
            is_admin: state.session().is_admin(),
            cart_count: summary.item_count,
            cart_total: summary.total_display(),
            theme: state.theme(),
        }
    }

    /// Greeting line, with a star for admins.
    #[must_use]
    pub fn greeting(&self) -> Option<String> {
        self.welcome.as_ref().map(|name| {
            if self.is_admin {
                format!("Welcome, {name} ★")
            } else {
                format!("Welcome, {name}")
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SupabaseConfig;
    use crate::storage::MemoryStorage;
    use crate::supabase::SupabaseClient;

    fn anonymous_state() -> AppState {
        let config = SupabaseConfig::new("http://127.0.0.1:9", "anon").unwrap();
        let client = SupabaseClient::new(&config, Duration::from_millis(200)).unwrap();
        AppState::new(client, MemoryStorage::new())
    }

    #[test]
    fn test_anonymous_admin_panel_has_no_controls() {
        let mut state = anonymous_state();
        let panel = AdminPanel::for_state(&mut state);

        assert!(matches!(panel, AdminPanel::SignInRequired));
        assert!(!panel.has_controls());
        assert!(panel.notice().is_some());
    }

    #[test]
    fn test_anonymous_header() {
        let state = anonymous_state();
        let header = Header::of(&state);

        assert!(header.greeting().is_none());
        assert_eq!(header.cart_count, 0);
        assert_eq!(header.cart_total, "R$ 0.00");
        assert_eq!(header.theme, Theme::Light);
    }

    #[test]
    fn test_admin_greeting_has_star() {
        let header = Header {
            welcome: Some("ana".to_string()),
            is_admin: true,
            cart_count: 0,
            cart_total: String::new(),
            theme: Theme::Dark,
        };
        assert_eq!(header.greeting().as_deref(), Some("Welcome, ana ★"));
    }
}
