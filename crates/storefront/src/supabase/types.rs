//! Wire types for the `cart` table.

use serde::{Deserialize, Serialize};

use vitrine_core::{CartEntry, Product, ProductId, UserId};

/// A row inserted into the remote `cart` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRow {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

impl CartRow {
    /// The row mirroring `entry` for `user_id`.
    #[must_use]
    pub fn from_entry(user_id: UserId, entry: &CartEntry) -> Self {
        Self {
            user_id,
            product_id: entry.product.id.clone(),
            quantity: entry.quantity,
        }
    }
}

/// A row read back from `cart` with its product embedded
/// (`select=product_id,quantity,products(*)`).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCartRow {
    pub product_id: ProductId,
    pub quantity: i32,
    /// `None` when the referenced product no longer resolves.
    #[serde(default)]
    pub products: Option<Product>,
}

impl RemoteCartRow {
    /// Convert to a local cart entry keyed by `product_id`.
    #[must_use]
    pub fn into_entry(self) -> CartEntry {
        let mut product = self
            .products
            .unwrap_or_else(|| Product::placeholder(self.product_id.clone()));
        product.id = self.product_id;

        CartEntry {
            product,
            quantity: self.quantity,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_remote_row_into_entry() {
        let row: RemoteCartRow = serde_json::from_value(json!({
            "product_id": "p1",
            "quantity": 3,
            "products": {
                "id": "p1",
                "title": "Phone",
                "price": 199.99,
                "description": "x",
                "thumbnail": ""
            }
        }))
        .unwrap();

        let entry = row.into_entry();
        assert_eq!(entry.product.id, ProductId::new("p1"));
        assert_eq!(entry.quantity, 3);
        assert_eq!(entry.product.title, "Phone");
        assert_eq!(entry.product.price.amount(), Decimal::new(19999, 2));
    }

    #[test]
    fn test_remote_row_without_product_keeps_quantity() {
        let row: RemoteCartRow = serde_json::from_value(json!({
            "product_id": 9,
            "quantity": 2,
            "products": null
        }))
        .unwrap();

        let entry = row.into_entry();
        assert_eq!(entry.product.id, ProductId::from(9));
        assert_eq!(entry.quantity, 2);
        assert!(entry.product.title.is_empty());
    }

    #[test]
    fn test_cart_row_shape() {
        let user = UserId::new(Uuid::nil());
        let row = CartRow {
            user_id: user,
            product_id: ProductId::from(4),
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "user_id": "00000000-0000-0000-0000-000000000000",
                "product_id": 4,
                "quantity": 2
            })
        );
    }
}
