//! Mirrors the local cart to the signed-in user's remote `cart` rows.
//!
//! Last writer wins, no merging:
//! - session established with an empty local cart: the remote cart replaces it
//! - session established with local entries: local overwrites the remote
//! - any cart change while signed in: local overwrites the remote
//!
//! An overwrite deletes every remote row for the user, then inserts one row
//! per local entry. The pair is not atomic. Failures are logged and dropped;
//! the local cart stays authoritative for display.

use tracing::{debug, info, instrument, warn};

use vitrine_core::{CartEntry, UserId};

use crate::cart::CartStore;
use crate::models::Session;
use crate::storage::LocalStorage;
use crate::supabase::{CartRow, RemoteCartRow, RestClient, SupabaseClient, SupabaseError};

/// What a sync step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote cart replaced the local one (`entries` rows pulled).
    Pulled { entries: usize },
    /// The local cart overwrote the remote one.
    Pushed { entries: usize },
    /// A request failed; nothing further was attempted.
    Failed,
}

/// Sync coordinator bound to one signed-in user.
#[derive(Clone, Copy)]
pub struct CartSync<'a> {
    rest: RestClient<'a>,
    user_id: UserId,
}

impl<'a> CartSync<'a> {
    #[must_use]
    pub fn new(client: &'a SupabaseClient, session: &'a Session) -> Self {
        Self {
            rest: client.rest(Some(session)),
            user_id: session.user_id(),
        }
    }

    /// Reconcile after sign-in or restore.
    ///
    /// A pulled cart is persisted locally but not pushed back.
    #[instrument(skip_all, fields(user_id = %self.user_id, local = cart.entries().len()))]
    pub async fn on_session_established(
        &self,
        cart: &mut CartStore,
        storage: &dyn LocalStorage,
    ) -> SyncOutcome {
        if !cart.is_empty() {
            return self.push(cart.entries()).await;
        }

        match self.rest.select_cart(self.user_id).await {
            Ok(rows) => {
                let entries: Vec<CartEntry> =
                    rows.into_iter().map(RemoteCartRow::into_entry).collect();
                let count = entries.len();
                cart.replace(entries);
                cart.persist(storage);
                info!(entries = count, "Restored cart from account");
                SyncOutcome::Pulled { entries: count }
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch remote cart");
                SyncOutcome::Failed
            }
        }
    }

    /// Overwrite the remote cart with `entries`.
    #[instrument(skip_all, fields(user_id = %self.user_id, entries = entries.len()))]
    pub async fn push(&self, entries: &[CartEntry]) -> SyncOutcome {
        match self.overwrite(entries).await {
            Ok(()) => {
                debug!("Remote cart updated");
                SyncOutcome::Pushed {
                    entries: entries.len(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to sync cart");
                SyncOutcome::Failed
            }
        }
    }

    async fn overwrite(&self, entries: &[CartEntry]) -> Result<(), SupabaseError> {
        self.rest.delete_cart(self.user_id).await?;

        if entries.is_empty() {
            return Ok(());
        }

        let rows: Vec<CartRow> = entries
            .iter()
            .map(|entry| CartRow::from_entry(self.user_id, entry))
            .collect();
        self.rest.insert_cart(&rows).await
    }
}
