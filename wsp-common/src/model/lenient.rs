//! Field-level tolerant deserialization
//!
//! A peer sending `"played": "abc"` must not make the whole frame unreadable;
//! the offending field is dropped and the rest of the patch survives.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Deserialize an optional field, turning type mismatches and `null` into `None`
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Deserialize a flag, reading anything other than a JSON bool as `false`
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}
