//! Nullable integer encoding
//!
//! Terraform state cannot tell "unset" from "explicitly null" for a
//! number, so nullable API integers use `-1` to mean null: a configured
//! `-1` is sent as JSON `null`, and a `null` read back is stored as `-1`.

use serde_json::Value;

/// State value standing for an API null
pub const NULL_SENTINEL: i64 = -1;

/// State/config value to API value
pub fn encode(value: &Value) -> Value {
    match value.as_i64() {
        Some(NULL_SENTINEL) => Value::Null,
        _ => value.clone(),
    }
}

/// API value to state value
pub fn decode(value: &Value) -> Value {
    match value {
        Value::Null => Value::from(NULL_SENTINEL),
        Value::String(s) => s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        _ => value.clone(),
    }
}

/// Values below the sentinel are never valid
pub fn is_valid(value: i64) -> bool {
    value >= NULL_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_sentinel_to_null() {
        assert_eq!(encode(&json!(-1)), Value::Null);
        assert_eq!(encode(&json!(14)), json!(14));
        assert_eq!(encode(&json!(0)), json!(0));
    }

    #[test]
    fn test_decode_null_to_sentinel() {
        assert_eq!(decode(&Value::Null), json!(-1));
        assert_eq!(decode(&json!(30)), json!(30));
    }

    #[test]
    fn test_decode_numeric_string() {
        assert_eq!(decode(&json!("7")), json!(7));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(-1));
        assert!(is_valid(0));
        assert!(!is_valid(-2));
    }
}
