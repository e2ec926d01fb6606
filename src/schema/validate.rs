//! Configuration validation against a schema block

use super::sentinel;
use super::types::{Attribute, Block, ValueKind};
use crate::diagnostics::Diagnostic;
use chrono::{NaiveTime, Timelike};
use serde_json::{Map, Value};

/// Validate a configuration object, returning every problem found
pub fn validate(block: &Block, config: &Map<String, Value>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(block, config, "", &mut diagnostics);
    diagnostics
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_block(
    block: &Block,
    config: &Map<String, Value>,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for name in config.keys() {
        if !block.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error("Unsupported argument")
                    .with_detail(format!("An argument named \"{}\" is not expected here.", name))
                    .at(join_path(prefix, name)),
            );
        }
    }

    for (name, attr) in &block.attributes {
        let path = join_path(prefix, name);
        let value = config.get(name).filter(|v| !v.is_null());

        match value {
            None if attr.required => diagnostics.push(
                Diagnostic::error("Missing required argument")
                    .with_detail(format!("The argument \"{}\" is required.", name))
                    .at(path),
            ),
            None => {},
            Some(_) if !attr.is_settable() => diagnostics.push(
                Diagnostic::error("Value for unconfigurable attribute")
                    .with_detail(format!("\"{}\" is computed by the API and cannot be set.", name))
                    .at(path),
            ),
            Some(value) => validate_value(attr, value, &path, diagnostics),
        }
    }
}

fn type_error(path: &str, expected: &str) -> Diagnostic {
    Diagnostic::error("Incorrect attribute value type")
        .with_detail(format!("\"{}\" must be {}.", path, expected))
        .at(path)
}

fn validate_value(attr: &Attribute, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if !attr.kind.accepts(value) {
        diagnostics.push(type_error(path, kind_name(attr.kind)));
        return;
    }

    match attr.kind {
        ValueKind::List | ValueKind::Set => {
            let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
            if let Some(max) = attr.max_items {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error("Too many list items")
                            .with_detail(format!("\"{}\" accepts at most {} item(s).", path, max))
                            .at(path),
                    );
                }
            }
            if attr.kind == ValueKind::Set && has_duplicates(items) {
                diagnostics.push(
                    Diagnostic::error("Duplicate set element")
                        .with_detail(format!("\"{}\" must not contain duplicate values.", path))
                        .at(path),
                );
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_element(attr, item, &item_path, diagnostics);
            }
        },
        ValueKind::Map => {
            if let Some(entries) = value.as_object() {
                let elem = attr.elem.unwrap_or(ValueKind::String);
                for (key, item) in entries {
                    if !elem.accepts(item) {
                        diagnostics.push(type_error(&join_path(path, key), kind_name(elem)));
                    }
                }
            }
        },
        ValueKind::Int if attr.nullable => {
            if value.as_i64().is_some_and(|v| !sentinel::is_valid(v)) {
                diagnostics.push(
                    Diagnostic::error("Invalid value")
                        .with_detail(format!(
                            "\"{}\" must be {} (null) or a non-negative number.",
                            path,
                            sentinel::NULL_SENTINEL
                        ))
                        .at(path),
                );
            }
        },
        ValueKind::String => validate_string(attr, value.as_str().unwrap_or_default(), path, diagnostics),
        _ => {},
    }

    if !attr.kind.is_collection() && !attr.one_of.is_empty() && !attr.one_of.contains(value) {
        let allowed = attr
            .one_of
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        diagnostics.push(
            Diagnostic::error("Invalid value")
                .with_detail(format!("\"{}\" must be one of: {}.", path, allowed))
                .at(path),
        );
    }
}

fn validate_element(attr: &Attribute, item: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if let Some(block) = &attr.block {
        match item.as_object() {
            Some(object) => validate_block(block, object, path, diagnostics),
            None => diagnostics.push(type_error(path, "an object")),
        }
        return;
    }

    let elem = attr.elem.unwrap_or(ValueKind::String);
    if !elem.accepts(item) {
        diagnostics.push(type_error(path, kind_name(elem)));
    } else if !attr.one_of.is_empty() && !attr.one_of.contains(item) {
        diagnostics.push(
            Diagnostic::error("Invalid value")
                .with_detail(format!("\"{}\" is not an accepted value.", path))
                .at(path),
        );
    }
}

/// Strict `HH:MM:SS` with two-digit fields and no leap second
fn is_time_of_day(value: &str) -> bool {
    let two_digit_fields = value.len() == 8
        && value
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 2 || i == 5 { b == b':' } else { b.is_ascii_digit() });
    two_digit_fields
        && NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok_and(|time| time.nanosecond() == 0)
}

fn validate_string(attr: &Attribute, value: &str, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if attr.time_of_day && !is_time_of_day(value) {
        diagnostics.push(
            Diagnostic::error("Invalid time of day")
                .with_detail(format!("\"{}\" must use the HH:MM:SS format, got \"{}\".", path, value))
                .at(path),
        );
    }

    if attr.json && !value.trim().is_empty() {
        if let Err(err) = serde_json::from_str::<Value>(value) {
            diagnostics.push(
                Diagnostic::error("Invalid JSON")
                    .with_detail(format!("\"{}\" must contain a JSON document: {}", path, err))
                    .at(path),
            );
        }
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[..i].contains(item))
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::String => "a string",
        ValueKind::Int => "a whole number",
        ValueKind::Float => "a number",
        ValueKind::Bool => "a bool",
        ValueKind::List => "a list",
        ValueKind::Set => "a set",
        ValueKind::Map => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block() -> Block {
        let mut ssl = Attribute::new(ValueKind::Int).optional().computed();
        ssl.nullable = true;
        let mut from = Attribute::optional_string();
        from.time_of_day = true;
        let mut body = Attribute::optional_string();
        body.json = true;
        let mut monitor_type = Attribute::required_string();
        monitor_type.one_of = vec![json!("status"), json!("keyword")];
        let mut field = Attribute::new(ValueKind::List)
            .optional()
            .with_block(Block::new().with_attribute("name", Attribute::required_string()));
        field.max_items = Some(1);

        Block::new()
            .with_attribute("url", Attribute::required_string())
            .with_attribute("monitor_type", monitor_type)
            .with_attribute("ssl_expiration", ssl)
            .with_attribute("maintenance_from", from)
            .with_attribute("request_body", body)
            .with_attribute("cause_field", field)
            .with_attribute(
                "regions",
                Attribute::new(ValueKind::Set).optional().with_elem(ValueKind::String),
            )
            .with_attribute("status", Attribute::computed_string())
    }

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_config_has_no_diagnostics() {
        let diags = validate(
            &block(),
            &config(json!({
                "url": "https://example.com",
                "monitor_type": "status",
                "ssl_expiration": -1,
                "maintenance_from": "01:00:00",
                "request_body": "{\"a\": 1}",
                "cause_field": [{"name": "Cause"}],
                "regions": ["us", "eu"]
            })),
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_missing_required() {
        let diags = validate(&block(), &config(json!({"monitor_type": "status"})));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("url"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let diags = validate(&block(), &config(json!({"url": null, "monitor_type": "status"})));
        assert_eq!(diags[0].summary, "Missing required argument");
    }

    #[test]
    fn test_unknown_argument() {
        let diags = validate(
            &block(),
            &config(json!({"url": "u", "monitor_type": "status", "colour": "red"})),
        );
        assert_eq!(diags[0].summary, "Unsupported argument");
    }

    #[test]
    fn test_computed_attribute_cannot_be_set() {
        let diags = validate(
            &block(),
            &config(json!({"url": "u", "monitor_type": "status", "status": "up"})),
        );
        assert_eq!(diags[0].summary, "Value for unconfigurable attribute");
    }

    #[test]
    fn test_type_mismatch_and_one_of() {
        let diags = validate(&block(), &config(json!({"url": 5, "monitor_type": "bogus"})));
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().any(|d| d.summary == "Incorrect attribute value type"));
        assert!(diags.iter().any(|d| d.detail.contains("must be one of")));
    }

    #[test]
    fn test_nullable_below_sentinel() {
        let diags = validate(
            &block(),
            &config(json!({"url": "u", "monitor_type": "status", "ssl_expiration": -5})),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("ssl_expiration"));
    }

    #[test]
    fn test_bad_time_and_json() {
        let diags = validate(
            &block(),
            &config(json!({
                "url": "u",
                "monitor_type": "status",
                "maintenance_from": "25:00",
                "request_body": "{not json"
            })),
        );
        assert_eq!(diags.len(), 2);

        for bad in ["1:2:3", "23:59:60", "01:00", "24:00:00", "1a:00:00"] {
            let diags = validate(
                &block(),
                &config(json!({"url": "u", "monitor_type": "status", "maintenance_from": bad})),
            );
            assert_eq!(diags.len(), 1, "{}", bad);
            assert_eq!(diags[0].summary, "Invalid time of day");
        }
        for good in ["00:00:00", "23:59:59"] {
            let diags = validate(
                &block(),
                &config(json!({"url": "u", "monitor_type": "status", "maintenance_from": good})),
            );
            assert!(diags.is_empty(), "{}: {:?}", good, diags);
        }
    }

    #[test]
    fn test_nested_block_errors_have_paths() {
        let diags = validate(
            &block(),
            &config(json!({
                "url": "u",
                "monitor_type": "status",
                "cause_field": [{"name": "a"}, {}]
            })),
        );
        assert!(diags.iter().any(|d| d.summary == "Too many list items"));
        assert!(diags
            .iter()
            .any(|d| d.attribute.as_deref() == Some("cause_field.1.name")));
    }

    #[test]
    fn test_set_duplicates() {
        let diags = validate(
            &block(),
            &config(json!({"url": "u", "monitor_type": "status", "regions": ["us", "us"]})),
        );
        assert_eq!(diags[0].summary, "Duplicate set element");
    }
}
