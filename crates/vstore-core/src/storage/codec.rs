//! JSON encoding of stored values
//!
//! Values are stored as JSON text. Reading is lenient: text that does not
//! parse as JSON is handed back as a plain string, and empty text reads as
//! absent.

use serde_json::Value;

/// Encode a value as JSON text
pub fn serialize(value: &Value) -> String {
    value.to_string()
}

/// Decode stored text back into a value
///
/// Returns `None` for missing or empty text.
pub fn deserialize(raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) if raw.is_empty() => None,
        Err(_) => Some(Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_strings_are_quoted() {
        assert_eq!(serialize(&json!("bar")), "\"bar\"");
        assert_eq!(serialize(&json!(["guarded", "version"])), r#"["guarded","version"]"#);
    }

    #[test]
    fn test_deserialize_json() {
        assert_eq!(deserialize(Some("42")), Some(json!(42)));
        assert_eq!(deserialize(Some(r#"{"a":1}"#)), Some(json!({"a": 1})));
        assert_eq!(deserialize(Some("null")), Some(Value::Null));
    }

    #[test]
    fn test_deserialize_missing_or_empty() {
        assert_eq!(deserialize(None), None);
        assert_eq!(deserialize(Some("")), None);
    }

    #[test]
    fn test_deserialize_raw_string_fallback() {
        // Written by something other than this crate, e.g. a bare token
        assert_eq!(deserialize(Some("hello world")), Some(json!("hello world")));
        assert_eq!(deserialize(Some("{broken")), Some(json!("{broken")));
    }
}
