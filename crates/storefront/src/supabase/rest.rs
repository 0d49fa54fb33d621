//! PostgREST table operations for `products`, `profiles` and `cart`.

use reqwest::Method;
use secrecy::SecretString;
use tracing::{debug, instrument, warn};
use url::Url;

use vitrine_core::{Product, ProductDraft, ProductId, Profile, UserId};

use super::types::{CartRow, RemoteCartRow};
use super::{SupabaseClient, SupabaseError};

const PRODUCTS: &str = "products";
const PROFILES: &str = "profiles";
const CART: &str = "cart";

/// Single-object responses (`.single()` in the JS client).
const ACCEPT_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Data API handle bound to one bearer token.
///
/// Obtained from [`SupabaseClient::rest`]; borrows the client and token.
#[derive(Clone, Copy)]
pub struct RestClient<'a> {
    client: &'a SupabaseClient,
    bearer: Option<&'a SecretString>,
}

impl<'a> RestClient<'a> {
    pub(super) const fn new(client: &'a SupabaseClient, bearer: Option<&'a SecretString>) -> Self {
        Self { client, bearer }
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.inner.client.request(method, url);
        self.client.authorize(request, self.bearer)
    }

    /// `<rest>/<table>?<query...>`
    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, SupabaseError> {
        let mut url = self.client.rest_endpoint(table)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Fetch the whole catalog.
    ///
    /// Rows that do not decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a JSON array.
    #[instrument(skip(self))]
    pub async fn select_products(&self) -> Result<Vec<Product>, SupabaseError> {
        let url = self.table_url(PRODUCTS, &[("select", "*")])?;
        let rows: Vec<serde_json::Value> = self.client.execute(self.request(Method::GET, url)).await?;
        let products = decode_products(rows);
        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    /// Insert a product and return the stored row(s).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the insert is rejected.
    #[instrument(skip_all, fields(title = %draft.title))]
    pub async fn insert_product(&self, draft: &ProductDraft) -> Result<Vec<Product>, SupabaseError> {
        let url = self.table_url(PRODUCTS, &[("select", "*")])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(draft);
        self.client.execute(request).await
    }

    /// Update a product by id and return the updated row(s).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the update is rejected.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        updates: &ProductDraft,
    ) -> Result<Vec<Product>, SupabaseError> {
        let filter = eq(id);
        let url = self.table_url(PRODUCTS, &[("id", filter.as_str()), ("select", "*")])?;
        let request = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(updates);
        self.client.execute(request).await
    }

    /// Delete a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the delete is rejected.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), SupabaseError> {
        let filter = eq(id);
        let url = self.table_url(PRODUCTS, &[("id", filter.as_str())])?;
        self.client
            .execute_empty(self.request(Method::DELETE, url))
            .await
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Fetch the profile row for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no single row matches.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn fetch_profile(&self, user_id: UserId) -> Result<Profile, SupabaseError> {
        let filter = eq(user_id);
        let url = self.table_url(PROFILES, &[("select", "*"), ("id", filter.as_str())])?;
        let request = self
            .request(Method::GET, url)
            .header(reqwest::header::ACCEPT, ACCEPT_OBJECT);
        self.client.execute(request).await
    }

    /// Insert or update a profile row, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the write is rejected.
    #[instrument(skip_all, fields(user_id = %profile.id))]
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), SupabaseError> {
        let url = self.table_url(PROFILES, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(profile);
        self.client.execute_empty(request).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch a user's cart rows with their products embedded.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows do not decode.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn select_cart(&self, user_id: UserId) -> Result<Vec<RemoteCartRow>, SupabaseError> {
        let filter = eq(user_id);
        let url = self.table_url(
            CART,
            &[("select", "product_id,quantity,products(*)"), ("user_id", filter.as_str())],
        )?;
        self.client.execute(self.request(Method::GET, url)).await
    }

    /// Delete every cart row belonging to a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the delete is rejected.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn delete_cart(&self, user_id: UserId) -> Result<(), SupabaseError> {
        let filter = eq(user_id);
        let url = self.table_url(CART, &[("user_id", filter.as_str())])?;
        self.client
            .execute_empty(self.request(Method::DELETE, url))
            .await
    }

    /// Insert cart rows in one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the insert is rejected.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn insert_cart(&self, rows: &[CartRow]) -> Result<(), SupabaseError> {
        let url = self.table_url(CART, &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(rows);
        self.client.execute_empty(request).await
    }
}

fn decode_products(rows: Vec<serde_json::Value>) -> Vec<Product> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<Product>(row) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable product row");
                None
            }
        })
        .collect()
}

/// PostgREST equality filter value.
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SupabaseConfig;

    fn client() -> SupabaseClient {
        let config = SupabaseConfig::new("https://abcd.supabase.co", "anon").unwrap();
        SupabaseClient::new(&config, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_table_url_encodes_filters() {
        let client = client();
        let rest = client.rest(None);
        let url = rest
            .table_url(CART, &[("select", "product_id,quantity,products(*)"), ("user_id", "eq.42")])
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/cart");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "product_id,quantity,products(*)".to_string()),
                ("user_id".to_string(), "eq.42".to_string()),
            ]
        );
    }

    #[test]
    fn test_table_url_without_query() {
        let client = client();
        let url = client.rest(None).table_url(PROFILES, &[]).unwrap();
        assert_eq!(url.as_str(), "https://abcd.supabase.co/rest/v1/profiles");
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq(ProductId::from(7)), "eq.7");
        assert_eq!(eq("p1"), "eq.p1");
    }

    #[test]
    fn test_decode_products_skips_bad_rows() {
        let rows = vec![
            serde_json::json!({ "id": 1, "title": "Mug", "price": "12.00" }),
            serde_json::json!({ "title": "no id", "price": 3 }),
            serde_json::json!({ "id": 2, "title": null, "price": null, "description": null }),
            serde_json::json!({ "id": 3, "title": "Bad", "price": "abc" }),
        ];

        let products = decode_products(rows);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert!(products[1].title.is_empty());
        assert_eq!(products[1].price, vitrine_core::Price::ZERO);
    }
}
