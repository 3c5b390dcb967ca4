//! Readers for pulling typed fields out of untyped JSON mappings.
//!
//! Every reader distinguishes three cases: the key is absent, the key is
//! present with a usable value, and the key is present with a value of the
//! wrong JSON type. Absence of a required key is a [`SchemaError::MissingField`];
//! a wrong type is a [`SchemaError::InvalidField`]. Optional readers treat an
//! explicit `null` the same as an absent key.

use crate::error::{Result, SchemaError};
use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Require `value` to be a JSON object.
pub(crate) fn as_object<'a>(value: &'a Value, field: &'static str) -> Result<&'a JsonMap> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::invalid(field, format!("expected object, got {}", json_type(value))))
}

pub(crate) fn required<'a>(map: &'a JsonMap, key: &'static str) -> Result<&'a Value> {
    map.get(key).ok_or(SchemaError::MissingField(key))
}

pub(crate) fn required_str(map: &JsonMap, key: &'static str) -> Result<String> {
    match required(map, key)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(SchemaError::invalid(
            key,
            format!("expected string, got {}", json_type(other)),
        )),
    }
}

/// Like [`required_str`], but an empty string is rejected too.
pub(crate) fn required_id(map: &JsonMap, key: &'static str) -> Result<String> {
    let s = required_str(map, key)?;
    if s.is_empty() {
        return Err(SchemaError::invalid(key, "must not be empty"));
    }
    Ok(s)
}

pub(crate) fn optional_str(map: &JsonMap, key: &'static str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(SchemaError::invalid(
            key,
            format!("expected string, got {}", json_type(other)),
        )),
    }
}

pub(crate) fn optional_str_list(map: &JsonMap, key: &'static str) -> Result<Option<Vec<String>>> {
    let items = match map.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(SchemaError::invalid(
                key,
                format!("expected array of strings, got {}", json_type(other)),
            ))
        }
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(SchemaError::invalid(
                key,
                format!("expected array of strings, found {} element", json_type(other)),
            )),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

pub(crate) fn optional_object(map: &JsonMap, key: &'static str) -> Result<Option<JsonMap>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj.clone())),
        Some(other) => Err(SchemaError::invalid(
            key,
            format!("expected object, got {}", json_type(other)),
        )),
    }
}

pub(crate) fn optional_count(map: &JsonMap, key: &'static str) -> Result<Option<u32>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| SchemaError::invalid(key, format!("expected non-negative integer, got {n}"))),
        Some(other) => Err(SchemaError::invalid(
            key,
            format!("expected non-negative integer, got {}", json_type(other)),
        )),
    }
}

/// First value among `keys` that is present and not `null`.
pub(crate) fn first_present<'a>(map: &'a JsonMap, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// Empty-ish values: `null`, `false`, zero, `""`, `[]` and `{}`.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
    }
}

/// Human-readable form of a value: strings are returned unquoted, everything
/// else as compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_str_distinguishes_missing_from_invalid() {
        let map = obj(json!({"traceId": 42}));

        assert_eq!(
            required_str(&map, "kpiId"),
            Err(SchemaError::MissingField("kpiId"))
        );
        assert!(matches!(
            required_str(&map, "traceId"),
            Err(SchemaError::InvalidField { field: "traceId", .. })
        ));
    }

    #[test]
    fn test_required_id_rejects_empty() {
        let map = obj(json!({"kpiId": ""}));
        assert!(matches!(
            required_id(&map, "kpiId"),
            Err(SchemaError::InvalidField { field: "kpiId", .. })
        ));
    }

    #[test]
    fn test_optional_readers_treat_null_as_absent() {
        let map = obj(json!({"a": null, "b": null, "c": null, "d": null}));
        assert_eq!(optional_str(&map, "a").unwrap(), None);
        assert_eq!(optional_str_list(&map, "b").unwrap(), None);
        assert_eq!(optional_object(&map, "c").unwrap(), None);
        assert_eq!(optional_count(&map, "d").unwrap(), None);
    }

    #[test]
    fn test_optional_str_list_rejects_mixed_arrays() {
        let map = obj(json!({"kpiIds": ["a", 1]}));
        assert!(optional_str_list(&map, "kpiIds").is_err());
    }

    #[test]
    fn test_optional_count_rejects_negative() {
        let map = obj(json!({"retryCount": -1}));
        assert!(optional_count(&map, "retryCount").is_err());

        let map = obj(json!({"retryCount": 3}));
        assert_eq!(optional_count(&map, "retryCount").unwrap(), Some(3));
    }

    #[test]
    fn test_first_present_skips_null() {
        let map = obj(json!({"message": null, "error": "E", "description": "D"}));
        assert_eq!(
            first_present(&map, &["message", "error", "description"]),
            Some(&json!("E"))
        );
        assert_eq!(first_present(&map, &["nope"]), None);
    }

    #[test]
    fn test_is_blank() {
        for blank in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(is_blank(&blank), "{blank} should be blank");
        }
        for filled in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(!is_blank(&filled), "{filled} should not be blank");
        }
    }

    #[test]
    fn test_display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("boom")), "boom");
        assert_eq!(display_value(&json!(401)), "401");
        assert_eq!(display_value(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
