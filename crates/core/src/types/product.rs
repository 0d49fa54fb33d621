//! Catalog products and the admin product form.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::Price;

/// A product row from the remote `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Id assigned by the remote store.
    pub id: ProductId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Price,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Image URL; empty when the product has no image.
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail: String,
}

impl Product {
    /// A stand-in for a product whose row is no longer available.
    ///
    /// Used when a remote cart row references a product the join could not
    /// resolve: the entry keeps its id and quantity but has no details.
    #[must_use]
    pub fn placeholder(id: ProductId) -> Self {
        Self {
            id,
            title: String::new(),
            price: Price::ZERO,
            description: String::new(),
            thumbnail: String::new(),
        }
    }
}

/// Product fields without an id, sent on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub price: Price,
    pub description: String,
    pub thumbnail: String,
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            thumbnail: product.thumbnail.clone(),
        }
    }
}

/// Errors rejected by [`ProductForm::into_draft`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductFormError {
    #[error("title is required")]
    MissingTitle,
}

/// Raw product form input, as typed by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub title: String,
    pub price: String,
    pub description: String,
    pub thumbnail: String,
}

impl ProductForm {
    /// Prefill a form for editing an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            thumbnail: product.thumbnail.clone(),
        }
    }

    /// Validate the form and build the payload sent to the remote store.
    ///
    /// The title must not be blank. The price goes through
    /// [`Price::parse_lenient`], so unusable input becomes zero.
    ///
    /// # Errors
    ///
    /// Returns [`ProductFormError::MissingTitle`] for a blank title.
    pub fn into_draft(self) -> Result<ProductDraft, ProductFormError> {
        if self.title.trim().is_empty() {
            return Err(ProductFormError::MissingTitle);
        }

        Ok(ProductDraft {
            price: Price::parse_lenient(&self.price),
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail,
        })
    }
}

/// Deserialize `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_from_remote_row() {
        let product: Product = serde_json::from_value(json!({
            "id": 3,
            "title": "Phone",
            "price": 199.99,
            "description": null,
            "thumbnail": "https://img.example/phone.png",
            "created_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(product.id, ProductId::from(3));
        assert_eq!(product.price.amount(), Decimal::new(19999, 2));
        assert_eq!(product.description, "");
    }

    #[test]
    fn test_product_tolerates_null_title_and_price() {
        let product: Product =
            serde_json::from_value(json!({ "id": "p9", "title": null, "price": null })).unwrap();

        assert!(product.title.is_empty());
        assert_eq!(product.price, Price::ZERO);
        assert!(product.thumbnail.is_empty());
    }

    #[test]
    fn test_form_into_draft() {
        let form = ProductForm {
            title: "Phone".to_string(),
            price: "199.99".to_string(),
            description: "x".to_string(),
            thumbnail: String::new(),
        };

        let draft = form.into_draft().unwrap();
        assert_eq!(draft.title, "Phone");
        assert_eq!(draft.price.amount(), Decimal::new(19999, 2));
    }

    #[test]
    fn test_form_requires_title() {
        let form = ProductForm {
            title: "   ".to_string(),
            price: "10".to_string(),
            ..ProductForm::default()
        };
        assert_eq!(form.into_draft(), Err(ProductFormError::MissingTitle));
    }

    #[test]
    fn test_form_invalid_price_becomes_zero() {
        let form = ProductForm {
            title: "Case".to_string(),
            price: "ten".to_string(),
            ..ProductForm::default()
        };
        assert_eq!(form.into_draft().unwrap().price, Price::ZERO);
    }
}
