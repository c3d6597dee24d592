//! Lenient decoding of plugin command arguments.
//!
//! The host stores every structured argument as JSON text, and nested entries (external
//! self-switches, variable conditions) as JSON text inside that JSON. Nothing in here
//! fails hard: malformed input is reported and treated as absent.

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode an argument holding a JSON-encoded array.
///
/// Missing, null and blank arguments are empty lists. Anything that is not an array
/// after decoding is logged and read as an empty list.
pub(crate) fn parse_list(value: Option<&Value>, arg: &str) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Vec::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                warn!("argument '{arg}' is not a list ({other}); ignoring it");
                Vec::new()
            },
            Err(e) => {
                warn!("argument '{arg}' is not valid JSON ({e}); ignoring it");
                Vec::new()
            },
        },
        Some(other) => {
            warn!("argument '{arg}' has unexpected shape ({other}); ignoring it");
            Vec::new()
        },
    }
}

/// Decode one nested structured entry, given either as JSON text or as an inline object.
pub(crate) fn parse_entry<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    match value {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    }
}

/// Read an integer stored either as a JSON number or as decimal text.
pub(crate) fn loose_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Read a text entry; numbers are accepted and rendered as text.
pub(crate) fn loose_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_list_decodes_json_text() {
        let arg = json!("[\"1\",\"2\"]");
        assert_eq!(parse_list(Some(&arg), "a"), vec![json!("1"), json!("2")]);
    }

    #[test]
    fn parse_list_is_empty_for_missing_blank_or_malformed() {
        assert!(parse_list(None, "a").is_empty());
        assert!(parse_list(Some(&json!("")), "a").is_empty());
        assert!(parse_list(Some(&json!("[1,")), "a").is_empty());
        assert!(parse_list(Some(&json!("{\"x\":1}")), "a").is_empty());
        assert!(parse_list(Some(&json!(12)), "a").is_empty());
    }

    #[test]
    fn parse_list_accepts_inline_arrays() {
        assert_eq!(parse_list(Some(&json!([3, 4])), "a"), vec![json!(3), json!(4)]);
    }

    #[test]
    fn loose_int_reads_numbers_and_text() {
        assert_eq!(loose_int(&json!(5)), Some(5));
        assert_eq!(loose_int(&json!(" 12 ")), Some(12));
        assert_eq!(loose_int(&json!("-3")), Some(-3));
        assert_eq!(loose_int(&json!("abc")), None);
        assert_eq!(loose_int(&json!("")), None);
        assert_eq!(loose_int(&json!(null)), None);
    }

    #[test]
    fn parse_entry_handles_text_and_objects() {
        #[derive(serde::Deserialize)]
        struct Probe {
            a: i32,
        }
        let from_text: Probe = parse_entry(&json!("{\"a\":1}")).expect("text entry");
        assert_eq!(from_text.a, 1);
        let from_object: Probe = parse_entry(&json!({"a": 2})).expect("object entry");
        assert_eq!(from_object.a, 2);
        assert!(parse_entry::<Probe>(&json!("{a:1}")).is_err());
    }
}
