//! Cached Record Module
//!
//! The JSON document persisted for a captured response:
//! `{"data": <body>, "timestamp": "<ISO-8601 UTC>", "contentType": "<type>"}`.
//! `contentType` (and `raw`) may be absent; readers fall back to guessing
//! from `data`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// `application/json` and `+json` suffixed types, parameters ignored.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == APPLICATION_JSON || essence.ends_with("+json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// Response body: decoded when it was typed as JSON, else the body text
    pub data: Value,
    pub timestamp: String,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// `data` holds a JSON-typed body verbatim because decoding it would
    /// not reproduce the same bytes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub raw: bool,
}

impl CachedRecord {
    /// Captures `body`, served with `content_type`, as of `now`.
    pub fn capture(body: &[u8], content_type: Option<&str>, now: DateTime<Utc>) -> Self {
        let text = || Value::String(String::from_utf8_lossy(body).into_owned());
        let json_typed = content_type.is_some_and(is_json_content_type);

        let (data, raw) = if json_typed {
            match serde_json::from_slice::<Value>(body) {
                Ok(value) if value.to_string().as_bytes() == body => (value, false),
                _ => (text(), true),
            }
        } else {
            (text(), false)
        };

        Self {
            data,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            content_type: content_type.map(str::to_string),
            raw,
        }
    }

    /// Parses a stored record. Returns `None` for anything that is not one.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn to_json(&self) -> String {
        // Value and String fields always serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Whether the body is JSON: by its recorded type, else by its shape.
    pub fn is_json(&self) -> bool {
        match &self.content_type {
            Some(content_type) => is_json_content_type(content_type),
            None => !self.data.is_string(),
        }
    }

    /// Content type to serve the body with.
    pub fn content_type(&self) -> &str {
        match &self.content_type {
            Some(content_type) => content_type,
            None if self.is_json() => APPLICATION_JSON,
            None => TEXT_PLAIN,
        }
    }

    /// Body bytes to serve for this record.
    pub fn body(&self) -> Vec<u8> {
        match &self.data {
            Value::String(text) if self.raw || !self.is_json() => text.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_capture_json_body() {
        let record = CachedRecord::capture(br#"{"foo":"bar"}"#, Some("application/json"), at());

        assert_eq!(
            record.to_json(),
            r#"{"data":{"foo":"bar"},"timestamp":"2024-05-01T10:00:00.000Z","contentType":"application/json"}"#
        );
        assert!(record.is_json());
        assert_eq!(record.body(), br#"{"foo":"bar"}"#.to_vec());
    }

    #[test]
    fn test_json_string_body_keeps_its_quotes() {
        let record = CachedRecord::capture(br#""hello""#, Some("application/json"), at());

        assert_eq!(record.data, Value::String("hello".into()));
        assert!(!record.raw);
        assert_eq!(record.body(), br#""hello""#.to_vec());
        assert_eq!(record.content_type(), "application/json");
    }

    #[test]
    fn test_non_compact_json_body_kept_verbatim() {
        let body = b"{ \"a\": 1 }";
        let record = CachedRecord::capture(body, Some("application/problem+json"), at());

        assert!(record.raw);
        assert_eq!(record.body(), body.to_vec());
        assert_eq!(record.content_type(), "application/problem+json");
    }

    #[test]
    fn test_capture_html_body_keeps_type() {
        let record = CachedRecord::capture(b"<p>hello</p>", Some("text/html; charset=utf-8"), at());

        assert_eq!(record.data, Value::String("<p>hello</p>".into()));
        assert!(!record.is_json());
        assert_eq!(record.body(), b"<p>hello</p>".to_vec());
        assert_eq!(record.content_type(), "text/html; charset=utf-8");
    }

    #[test]
    fn test_untyped_json_looking_body_stays_text() {
        let record = CachedRecord::capture(b"[1,2]", None, at());

        assert_eq!(record.data, Value::String("[1,2]".into()));
        assert_eq!(record.body(), b"[1,2]".to_vec());
        assert_eq!(record.content_type(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_record_without_content_type_is_read() {
        let record = CachedRecord::parse(
            r#"{"data":[1,2,3],"timestamp":"2024-05-01T10:00:00.000Z"}"#,
        )
        .unwrap();

        assert_eq!(record.captured_at(), Some(at()));
        assert!(record.is_json());
        assert_eq!(record.content_type(), "application/json");
        assert_eq!(record.body(), b"[1,2,3]".to_vec());
    }

    #[test]
    fn test_json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/vnd.api+json"));
        assert!(!is_json_content_type("text/html"));
    }

    #[test]
    fn test_parse_rejects_other_documents() {
        assert!(CachedRecord::parse("plain text").is_none());
        assert!(CachedRecord::parse(r#"{"foo":"bar"}"#).is_none());
    }
}
