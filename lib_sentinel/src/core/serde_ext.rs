//! Lenient field decoders shared by the feed envelopes and the REST types.
//! The backend is not consistent about numeric vs string identifiers.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts either a JSON string or number and keeps it as text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}

/// Like [`string_or_number`], but `null` and empty strings become `None`.
pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = string_or_number(deserializer)?;
    Ok((!text.is_empty()).then_some(text))
}
