//! Application profile attached to an authenticated user.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::product::null_as_default;

/// A row of the remote `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Grants access to product management; `null` counts as `false`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin: bool,
}
