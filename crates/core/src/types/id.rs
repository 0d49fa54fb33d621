//! Newtype IDs for type-safe entity references.
//!
//! Product ids are assigned by the remote store and may be integers
//! (`bigint` identity columns) or text. [`ProductId`] compares by its text
//! but remembers which JSON form it arrived in, and writes that form back.
//! User ids are the auth provider's UUIDs.

use core::fmt;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identifier of a product row.
///
/// `7` and `"7"` name the same product; `"007"` does not.
#[derive(Debug, Clone)]
pub struct ProductId {
    text: String,
    numeric: bool,
}

impl ProductId {
    /// Create a text product id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            text: id.into(),
            numeric: false,
        }
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the id arrived as a JSON number.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.numeric
    }
}

impl PartialEq for ProductId {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for ProductId {}

impl Hash for ProductId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for ProductId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProductId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for ProductId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self {
            text: id.to_string(),
            numeric: true,
        }
    }
}

impl Serialize for ProductId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.text.parse::<i64>() {
            Ok(n) if self.numeric => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.text),
        }
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self::from(n),
            Raw::Text(s) => Self::new(s),
        })
    }
}

/// Identifier of an authenticated user (the auth provider's UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_accepts_numbers_and_strings() {
        let from_number: ProductId = serde_json::from_str("42").unwrap();
        let from_text: ProductId = serde_json::from_str("\"p1\"").unwrap();

        assert_eq!(from_number.as_str(), "42");
        assert!(from_number.is_numeric());
        assert_eq!(from_text.as_str(), "p1");
        assert!(!from_text.is_numeric());
    }

    #[test]
    fn test_product_id_serializes_in_arrival_form() {
        assert_eq!(serde_json::to_string(&ProductId::from(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&ProductId::new("p1")).unwrap(),
            "\"p1\""
        );
        assert_eq!(
            serde_json::to_string(&ProductId::new("12")).unwrap(),
            "\"12\""
        );
    }

    #[test]
    fn test_digit_string_id_keeps_its_text() {
        for raw in ["\"007\"", "\"+5\"", "\"-0\""] {
            let id: ProductId = serde_json::from_str(raw).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, raw);

            let back: ProductId = serde_json::from_str(&json).unwrap();
            assert_eq!(back.as_str(), id.as_str());
        }
        assert_ne!(ProductId::new("007"), ProductId::from(7));
    }

    #[test]
    fn test_product_id_equality_ignores_json_form() {
        let a: ProductId = serde_json::from_str("5").unwrap();
        let b: ProductId = "5".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_user_id_display_is_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(UserId::new(uuid).to_string(), uuid.to_string());
    }
}
