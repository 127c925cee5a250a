//! Deserialization helpers for device responses

use serde::{Deserialize, Deserializer};

/// Deserialize a field, treating an explicit JSON `null` like a missing field
///
/// Combine with `#[serde(default)]` so both forms yield `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
