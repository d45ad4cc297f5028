//! Deserialization helpers for fields with server-side type drift
//!
//! The management API is not strictly typed: numeric fields such as ports
//! and storage sizes arrive sometimes as JSON numbers and sometimes as
//! quoted strings, and booleans occasionally arrive as `"true"`/`"false"`.
//! Rather than decoding into dynamic values, the resource shapes keep their
//! strong types and annotate the drifting fields with these explicit,
//! documented coercions.

use serde::de::{Deserializer, Error as DeError, Unexpected};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    String(String),
}

/// Decode a `u64` from either a JSON number or a numeric string
pub fn u64_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| DeError::invalid_value(Unexpected::Str(&s), &"a numeric string")),
    }
}

/// Decode an optional `u64` from a number, a numeric string, or null
pub fn opt_u64_or_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DeError::invalid_value(Unexpected::Str(&s), &"a numeric string")),
    }
}

/// Decode an optional `bool` from a boolean, a `"true"`/`"false"` string,
/// or null. String matching is case-insensitive.
pub fn opt_bool_or_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<bool>, D::Error> {
    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(DeError::invalid_value(
                Unexpected::Str(&s),
                &"\"true\" or \"false\"",
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Shape {
        #[serde(deserialize_with = "super::u64_or_string")]
        port: u64,
        #[serde(default, deserialize_with = "super::opt_u64_or_string")]
        storage: Option<u64>,
        #[serde(default, deserialize_with = "super::opt_bool_or_string")]
        enabled: Option<bool>,
    }

    #[test]
    fn accepts_plain_number() {
        let s: Shape = serde_json::from_str(r#"{"port": 3306}"#).unwrap();
        assert_eq!(s.port, 3306);
        assert_eq!(s.storage, None);
    }

    #[test]
    fn accepts_numeric_string() {
        let s: Shape = serde_json::from_str(r#"{"port": "3306", "storage": " 25 "}"#).unwrap();
        assert_eq!(s.port, 3306);
        assert_eq!(s.storage, Some(25));
    }

    #[test]
    fn rejects_non_numeric_string() {
        let result = serde_json::from_str::<Shape>(r#"{"port": "lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_bool_or_string_bool() {
        let s: Shape = serde_json::from_str(r#"{"port": 1, "enabled": true}"#).unwrap();
        assert_eq!(s.enabled, Some(true));

        let s: Shape = serde_json::from_str(r#"{"port": 1, "enabled": "FALSE"}"#).unwrap();
        assert_eq!(s.enabled, Some(false));
    }

    #[test]
    fn null_decodes_as_none() {
        let s: Shape =
            serde_json::from_str(r#"{"port": 1, "storage": null, "enabled": null}"#).unwrap();
        assert_eq!(s.storage, None);
        assert_eq!(s.enabled, None);
    }
}
