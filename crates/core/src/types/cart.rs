//! Cart entries and the header summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::format_amount;
use super::product::Product;

/// A product in the cart with its quantity.
///
/// Serialized flat (product fields plus `quantity`), which is also the shape
/// of the local cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: i32,
}

impl CartEntry {
    /// A new entry holding one unit of `product`.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    /// The entry's product id.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}

/// Item count and total shown next to the cart icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSummary {
    /// Sum of quantities.
    pub item_count: i64,
    /// Sum of line totals.
    pub total: Decimal,
}

impl CartSummary {
    /// Summarize a list of entries.
    #[must_use]
    pub fn of(entries: &[CartEntry]) -> Self {
        entries.iter().fold(Self::default(), |acc, entry| Self {
            item_count: acc.item_count + i64::from(entry.quantity),
            total: acc.total + entry.line_total(),
        })
    }

    /// Total formatted for display.
    #[must_use]
    pub fn total_display(&self) -> String {
        format_amount(self.total)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Price;

    fn product(id: &str, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Price::parse(price).unwrap(),
            description: String::new(),
            thumbnail: String::new(),
        }
    }

    #[test]
    fn test_entry_serializes_flat() {
        let entry = CartEntry {
            product: product("p1", "10"),
            quantity: 3,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], json!("p1"));
        assert_eq!(value["quantity"], json!(3));
        assert_eq!(value["title"], json!("Product p1"));

        let back: CartEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_snapshot_keeps_digit_string_id() {
        let entry = CartEntry::new(Product::placeholder(ProductId::new("007")));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""id":"007""#), "{json}");

        let back: CartEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), &ProductId::new("007"));
        assert_ne!(back.id(), &ProductId::from(7));
    }

    #[test]
    fn test_summary() {
        let entries = vec![
            CartEntry {
                product: product("a", "2.50"),
                quantity: 2,
            },
            CartEntry::new(product("b", "10")),
        ];

        let summary = CartSummary::of(&entries);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.total, Decimal::from(15));
        assert_eq!(summary.total_display(), "R$ 15.00");
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(CartSummary::of(&[]), CartSummary::default());
    }
}
