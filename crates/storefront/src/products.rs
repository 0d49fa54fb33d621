//! In-memory product catalog.

use vitrine_core::{Product, ProductId};

/// The catalog as last loaded, plus its load status.
#[derive(Debug, Clone)]
pub struct ProductStore {
    products: Vec<Product>,
    loading: bool,
    error: Option<String>,
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore {
    /// An empty catalog that has not been loaded yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            products: Vec::new(),
            loading: true,
            error: None,
        }
    }

    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// True until the first load settles.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the catalog with a fresh load.
    pub fn replace(&mut self, products: Vec<Product>) {
        self.products = products;
        self.loading = false;
        self.error = None;
    }

    /// Record a failed load; the previous catalog is kept.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.loading = false;
        self.error = Some(error.into());
    }

    /// Append rows returned by an insert.
    pub fn append(&mut self, products: impl IntoIterator<Item = Product>) {
        self.products.extend(products);
    }

    /// Replace the entry with `id`. Returns whether one matched.
    pub fn replace_by_id(&mut self, id: &ProductId, product: Product) -> bool {
        match self.products.iter_mut().find(|p| &p.id == id) {
            Some(slot) => {
                *slot = product;
                true
            }
            None => false,
        }
    }

    /// Remove the entry with `id`. Returns whether one matched.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|p| &p.id != id);
        self.products.len() != before
    }
}

#[cfg(test)]
mod tests {
    use vitrine_core::Price;

    use super::*;

    fn product(id: i64, title: &str) -> Product {
        Product {
            title: title.to_string(),
            price: Price::parse_lenient("10"),
            ..Product::placeholder(ProductId::from(id))
        }
    }

    #[test]
    fn test_load_lifecycle() {
        let mut store = ProductStore::new();
        assert!(store.is_loading());

        store.fail("Fetching products failed! boom");
        assert!(!store.is_loading());
        assert_eq!(store.error(), Some("Fetching products failed! boom"));

        store.replace(vec![product(1, "Mug")]);
        assert!(store.error().is_none());
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_patch_operations() {
        let mut store = ProductStore::new();
        store.replace(vec![product(1, "Mug"), product(2, "Shirt")]);

        store.append(vec![product(3, "Phone")]);
        assert_eq!(store.all().len(), 3);

        assert!(store.replace_by_id(&ProductId::from(2), product(2, "Hoodie")));
        assert_eq!(store.get(&ProductId::from(2)).map(|p| p.title.as_str()), Some("Hoodie"));
        assert!(!store.replace_by_id(&ProductId::from(9), product(9, "Ghost")));

        assert!(store.remove(&ProductId::from(1)));
        assert!(!store.remove(&ProductId::from(1)));
        let titles: Vec<&str> = store.all().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Hoodie", "Phone"]);
    }
}
