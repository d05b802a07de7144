//! Cache Entry Module
//!
//! Defines the stored representation of a value and its TTL metadata.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Stored Value ==
/// A value as held by the memory store.
///
/// JSON objects and arrays are kept parsed; everything else stays as the
/// original text. [`StoredValue::to_text`] reverses the conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Json(Value),
    Text(String),
}

impl StoredValue {
    /// Parses `text` when it is a compact JSON object or array, otherwise
    /// keeps it raw. Text that would not serialize back identically (extra
    /// whitespace, escapes written differently) stays raw.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) if value.to_string() == text => {
                StoredValue::Json(value)
            }
            _ => StoredValue::Text(text.to_string()),
        }
    }

    /// Returns the text representation callers stored.
    pub fn to_text(&self) -> String {
        match self {
            StoredValue::Json(value) => value.to_string(),
            StoredValue::Text(text) => text.clone(),
        }
    }
}

// == Length Function ==
/// Computes the size an entry counts against the store bound.
pub type LengthFn = Arc<dyn Fn(&StoredValue, &str) -> usize + Send + Sync>;

/// Strings count their byte length, arrays their element count, anything else 1.
pub fn default_length(value: &StoredValue, _key: &str) -> usize {
    match value {
        StoredValue::Text(text) => text.len(),
        StoredValue::Json(Value::Array(items)) => items.len(),
        StoredValue::Json(_) => 1,
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: StoredValue,
    /// Size counted against the store bound
    pub size: usize,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry living for `ttl_seconds`.
    pub fn new(value: StoredValue, size: usize, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();

        Self {
            value,
            size,
            expires_at: now.saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_object_and_array_are_parsed() {
        assert!(matches!(
            StoredValue::from_text(r#"{"a":1}"#),
            StoredValue::Json(Value::Object(_))
        ));
        assert!(matches!(
            StoredValue::from_text("[1,2,3]"),
            StoredValue::Json(Value::Array(_))
        ));
    }

    #[test]
    fn test_scalars_and_plain_text_stay_raw() {
        assert_eq!(StoredValue::from_text("42"), StoredValue::Text("42".into()));
        assert_eq!(
            StoredValue::from_text(r#""quoted""#),
            StoredValue::Text(r#""quoted""#.into())
        );
        assert_eq!(
            StoredValue::from_text("not json {"),
            StoredValue::Text("not json {".into())
        );
    }

    #[test]
    fn test_to_text_restores_compact_json() {
        let text = r#"{"data":{"foo":"bar"},"timestamp":"2024-01-01T00:00:00.000Z"}"#;
        assert_eq!(StoredValue::from_text(text).to_text(), text);
    }

    #[test]
    fn test_non_compact_json_stays_raw() {
        let spaced = r#"{ "a": 1 }"#;
        assert_eq!(StoredValue::from_text(spaced), StoredValue::Text(spaced.into()));
        assert_eq!(StoredValue::from_text(spaced).to_text(), spaced);
    }

    #[test]
    fn test_default_length() {
        assert_eq!(default_length(&StoredValue::from_text("hello"), "k"), 5);
        assert_eq!(default_length(&StoredValue::from_text("[1,2,3]"), "k"), 3);
        assert_eq!(default_length(&StoredValue::from_text(r#"{"a":1,"b":2}"#), "k"), 1);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(StoredValue::Text("v".into()), 1, 1);
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: StoredValue::Text("test".into()),
            size: 4,
            expires_at: now,
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }
}
