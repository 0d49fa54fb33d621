//! Local-first shopping cart.
//!
//! The cart is an ordered list with at most one entry per product id. Every
//! mutation is written through to local storage under [`keys::CART`]; remote
//! mirroring is the sync coordinator's job.

use vitrine_core::{CartEntry, CartSummary, Product, ProductId};

use crate::models::keys;
use crate::storage::{self, LocalStorage};

/// The device's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartStore {
    entries: Vec<CartEntry>,
}

impl CartStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Read the persisted snapshot; missing or unreadable means empty.
    ///
    /// Duplicate ids in a hand-edited snapshot are folded into the first
    /// occurrence.
    #[must_use]
    pub fn load(storage: &dyn LocalStorage) -> Self {
        let mut store = Self::new();
        let snapshot: Vec<CartEntry> = storage::load_json(storage, keys::CART).unwrap_or_default();
        for entry in snapshot {
            match store.position(entry.id()) {
                Some(index) => {
                    let folded = &mut store.entries[index].quantity;
                    *folded = folded.saturating_add(entry.quantity);
                }
                None => store.entries.push(entry),
            }
        }
        store
    }

    /// Write the snapshot to local storage.
    pub fn persist(&self, storage: &dyn LocalStorage) {
        storage::save_json(storage, keys::CART, &self.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.entries)
    }

    /// Add one unit of `product`, merging with an existing entry.
    ///
    /// Quantities saturate at `i32::MAX`.
    pub fn add(&mut self, product: Product) {
        match self.position(&product.id) {
            Some(index) => {
                let quantity = &mut self.entries[index].quantity;
                *quantity = quantity.saturating_add(1);
            }
            None => self.entries.push(CartEntry::new(product)),
        }
    }

    /// Remove the entry for `id`. Returns whether one was present.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != id);
        self.entries.len() != before
    }

    /// Set the quantity of the entry for `id`, as given.
    ///
    /// Returns whether an entry matched.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: i32) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entries[index].quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace every entry (used when the remote cart wins).
    pub fn replace(&mut self, entries: Vec<CartEntry>) {
        self.entries.clear();
        for entry in entries {
            match self.position(entry.id()) {
                Some(index) => self.entries[index] = entry,
                None => self.entries.push(entry),
            }
        }
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use vitrine_core::Price;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: &str, price: &str) -> Product {
        Product {
            title: format!("Product {id}"),
            price: Price::parse(price).unwrap(),
            ..Product::placeholder(ProductId::from(id))
        }
    }

    fn assert_unique(cart: &CartStore) {
        let ids: HashSet<&ProductId> = cart.entries().iter().map(CartEntry::id).collect();
        assert_eq!(ids.len(), cart.entries().len());
    }

    #[test]
    fn test_add_same_product_twice() {
        let mut cart = CartStore::new();
        cart.add(product("p1", "5"));
        cart.add(product("p1", "5"));

        assert_eq!(cart.entries().len(), 1);
        assert_eq!(cart.entries()[0].quantity, 2);
    }

    #[test]
    fn test_mixed_mutations_keep_ids_unique() {
        let mut cart = CartStore::new();
        cart.add(product("a", "1"));
        cart.add(product("b", "2"));
        cart.add(product("a", "1"));
        assert!(cart.set_quantity(&ProductId::from("b"), 4));
        assert!(cart.remove(&ProductId::from("a")));
        cart.add(product("a", "1"));
        cart.add(product("c", "3"));
        cart.add(product("b", "2"));
        assert!(!cart.remove(&ProductId::from("missing")));
        assert!(!cart.set_quantity(&ProductId::from("missing"), 9));

        assert_unique(&cart);
        let ids: Vec<&str> = cart.entries().iter().map(|e| e.id().as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(cart.get(&ProductId::from("b")).unwrap().quantity, 5);
    }

    #[test]
    fn test_set_quantity_is_not_clamped() {
        let mut cart = CartStore::new();
        cart.add(product("a", "1"));

        cart.set_quantity(&ProductId::from("a"), 0);
        assert_eq!(cart.entries()[0].quantity, 0);
        cart.set_quantity(&ProductId::from("a"), -2);
        assert_eq!(cart.entries()[0].quantity, -2);
    }

    #[test]
    fn test_add_after_max_quantity_saturates() {
        let mut cart = CartStore::new();
        cart.add(product("a", "1"));
        cart.set_quantity(&ProductId::from("a"), i32::MAX);

        cart.add(product("a", "1"));

        assert_eq!(cart.entries()[0].quantity, i32::MAX);
        assert_eq!(cart.summary().item_count, i64::from(i32::MAX));
    }

    #[test]
    fn test_load_folds_huge_duplicates_without_overflow() {
        let storage = MemoryStorage::new();
        let huge = i32::MAX - 1;
        storage
            .set_item(
                keys::CART,
                &format!(
                    r#"[{{"id":"a","title":"A","price":"1","quantity":{huge}}},
                        {{"id":"a","title":"A","price":"1","quantity":{huge}}}]"#
                ),
            )
            .unwrap();

        let cart = CartStore::load(&storage);
        assert_eq!(cart.entries().len(), 1);
        assert_eq!(cart.entries()[0].quantity, i32::MAX);
    }

    #[test]
    fn test_persisted_digit_string_id_still_matches() {
        let storage = MemoryStorage::new();
        let mut cart = CartStore::new();
        cart.add(product("007", "1"));
        cart.persist(&storage);

        let loaded = CartStore::load(&storage);
        assert!(loaded.get(&ProductId::new("007")).is_some());
        assert!(loaded.get(&ProductId::from(7)).is_none());
    }

    #[test]
    fn test_clear_then_read_is_empty() {
        let mut cart = CartStore::new();
        cart.add(product("a", "1"));
        cart.add(product("b", "1"));
        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.entries().is_empty());
        assert_eq!(cart.summary().item_count, 0);
    }

    #[test]
    fn test_summary() {
        let mut cart = CartStore::new();
        cart.add(product("a", "10.50"));
        cart.add(product("a", "10.50"));
        cart.add(product("b", "3"));

        let summary = cart.summary();
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.total_display(), "R$ 24.00");
    }

    #[test]
    fn test_persist_and_load() {
        let storage = MemoryStorage::new();
        let mut cart = CartStore::new();
        cart.add(product("a", "2"));
        cart.add(product("a", "2"));
        cart.persist(&storage);

        let loaded = CartStore::load(&storage);
        assert_eq!(loaded, cart);
    }

    #[test]
    fn test_load_folds_duplicates_and_ignores_garbage() {
        let storage = MemoryStorage::new();
        storage
            .set_item(
                keys::CART,
                r#"[{"id":1,"title":"Mug","price":"4","quantity":1},
                    {"id":1,"title":"Mug","price":"4","quantity":2}]"#,
            )
            .unwrap();
        let cart = CartStore::load(&storage);
        assert_eq!(cart.entries().len(), 1);
        assert_eq!(cart.entries()[0].quantity, 3);

        storage.set_item(keys::CART, "not json").unwrap();
        assert!(CartStore::load(&storage).is_empty());
    }

    #[test]
    fn test_replace_keeps_ids_unique() {
        let mut cart = CartStore::new();
        cart.add(product("old", "1"));
        let mut p1 = CartEntry::new(product("p1", "1"));
        p1.quantity = 3;
        cart.replace(vec![p1.clone(), CartEntry::new(product("p1", "1"))]);

        assert_eq!(cart.entries().len(), 1);
        assert!(cart.get(&ProductId::from("old")).is_none());
    }
}
