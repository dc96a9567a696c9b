//! API handlers module

pub mod auth;
pub mod catalog;
pub mod comments;
pub mod health;
pub mod reviews;
pub mod titles;
pub mod users;

use serde::{Deserialize, Deserializer};

/// `?search=` on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
