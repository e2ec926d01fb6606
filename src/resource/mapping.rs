//! Mapping between Terraform state and API payloads
//!
//! `expand` turns configuration into a request body, `flatten` turns the
//! `attributes` of an API object back into state. Both walk the schema so
//! renames, the nullable sentinel and single nested objects are handled
//! in one place for every resource type.

use crate::schema::diff::{json_equivalent, values_equal};
use crate::schema::{sentinel, Attribute, Block, ValueKind};
use serde_json::{Map, Value};

fn present<'a>(values: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    values.get(name).filter(|v| !v.is_null())
}

/// Build a request body from every settable attribute present in `config`
///
/// Absent attributes with a schema default are sent with the default.
pub fn expand(block: &Block, config: &Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::new();

    for (name, attr) in &block.attributes {
        if !attr.is_settable() {
            continue;
        }
        let value = match present(config, name) {
            Some(value) => value.clone(),
            None => match &attr.default {
                Some(default) => default.clone(),
                None => continue,
            },
        };
        body.insert(attr.api_key(name).to_string(), expand_value(attr, &value));
    }

    body
}

/// Build a PATCH body holding only the attributes that changed
///
/// Attributes removed from configuration are sent as `null` so the API
/// clears them.
pub fn expand_changes(
    block: &Block,
    prior: &Map<String, Value>,
    config: &Map<String, Value>,
) -> Map<String, Value> {
    let mut body = Map::new();

    for (name, attr) in &block.attributes {
        if !attr.is_settable() {
            continue;
        }
        let old = present(prior, name);
        let new = present(config, name).or(attr.default.as_ref());

        match (old, new) {
            (None, None) => {},
            (Some(old), Some(new)) if values_equal(attr, old, new) => {},
            (_, Some(new)) => {
                body.insert(attr.api_key(name).to_string(), expand_value(attr, new));
            },
            (Some(_), None) => {
                body.insert(attr.api_key(name).to_string(), Value::Null);
            },
        }
    }

    body
}

fn expand_value(attr: &Attribute, value: &Value) -> Value {
    if attr.nullable {
        return sentinel::encode(value);
    }

    let Some(block) = &attr.block else {
        return value.clone();
    };
    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();

    if attr.is_single_object() {
        return items
            .first()
            .and_then(Value::as_object)
            .map(|object| Value::Object(expand(block, object)))
            .unwrap_or(Value::Null);
    }

    Value::Array(
        items
            .iter()
            .filter_map(Value::as_object)
            .map(|object| Value::Object(expand(block, object)))
            .collect(),
    )
}

/// Map API `attributes` into state
///
/// `previous` is the state or configuration the call was made with. Keys
/// missing from the response keep their previous value; `write_only`
/// attributes always do.
pub fn flatten(
    block: &Block,
    attributes: &Map<String, Value>,
    previous: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut state = Map::new();

    for (name, attr) in &block.attributes {
        let prev = previous.and_then(|p| present(p, name));

        let raw = if attr.write_only {
            None
        } else {
            attributes.get(attr.api_key(name))
        };

        let value = match raw {
            Some(raw) => flatten_value(attr, raw, prev),
            None => prev.cloned().unwrap_or(Value::Null),
        };

        if !value.is_null() {
            state.insert(name.clone(), value);
        }
    }

    state
}

fn flatten_value(attr: &Attribute, raw: &Value, prev: Option<&Value>) -> Value {
    if attr.nullable {
        return sentinel::decode(raw);
    }
    if raw.is_null() {
        return Value::Null;
    }

    if let Some(block) = &attr.block {
        let prev_items = prev.and_then(Value::as_array);
        let prev_at = |i: usize| {
            prev_items
                .and_then(|items| items.get(i))
                .and_then(Value::as_object)
        };
        return match raw {
            Value::Object(object) => Value::Array(vec![Value::Object(flatten(block, object, prev_at(0)))]),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| item.as_object().map(|o| (i, o)))
                    .map(|(i, object)| Value::Object(flatten(block, object, prev_at(i))))
                    .collect(),
            ),
            _ => Value::Null,
        };
    }

    match attr.kind {
        ValueKind::String if attr.json => flatten_json_string(raw, prev),
        ValueKind::String => match raw {
            Value::String(_) => raw.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => Value::String(other.to_string()),
        },
        ValueKind::Int | ValueKind::Float => match raw {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<f64>().map(Value::from))
                .unwrap_or_else(|_| raw.clone()),
            _ => raw.clone(),
        },
        ValueKind::Set => match prev {
            // Keep the configured order when the server reorders a set
            Some(prev) if values_equal(attr, prev, raw) => prev.clone(),
            _ => raw.clone(),
        },
        _ => raw.clone(),
    }
}

/// JSON documents may come back re-serialized or already parsed
fn flatten_json_string(raw: &Value, prev: Option<&Value>) -> Value {
    let text = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match prev.and_then(Value::as_str) {
        Some(prev_text) if json_equivalent(prev_text, &text) => Value::String(prev_text.to_string()),
        _ => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_block() -> Block {
        Block::new()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("special_type", Attribute::optional_string())
    }

    fn block() -> Block {
        let mut ssl = Attribute::new(ValueKind::Int).optional().computed();
        ssl.nullable = true;
        let mut cause = Attribute::new(ValueKind::List).optional().with_block(field_block());
        cause.max_items = Some(1);
        let mut attribute = Attribute::new(ValueKind::List).optional().with_block(field_block());
        attribute.api_name = Some("attributes".to_string());
        let mut password = Attribute::optional_string().sensitive();
        password.write_only = true;
        let mut template = Attribute::optional_string();
        template.json = true;
        let mut paused = Attribute::new(ValueKind::Bool).optional();
        paused.default = Some(json!(false));

        Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("url", Attribute::required_string())
            .with_attribute("ssl_expiration", ssl)
            .with_attribute("cause_field", cause)
            .with_attribute("attribute", attribute)
            .with_attribute("password", password)
            .with_attribute("body_template", template)
            .with_attribute("paused", paused)
            .with_attribute("status", Attribute::computed_string())
            .with_attribute(
                "regions",
                Attribute::new(ValueKind::Set).optional().with_elem(ValueKind::String),
            )
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_expand_create_body() {
        let body = expand(
            &block(),
            &map(json!({
                "url": "https://example.com",
                "ssl_expiration": -1,
                "cause_field": [{"name": "Cause", "special_type": null}],
                "attribute": [{"name": "Owner"}],
                "password": "hunter2",
                "status": "up"
            })),
        );
        assert_eq!(
            Value::Object(body),
            json!({
                "url": "https://example.com",
                "ssl_expiration": null,
                "cause_field": {"name": "Cause"},
                "attributes": [{"name": "Owner"}],
                "password": "hunter2",
                "paused": false
            })
        );
    }

    #[test]
    fn test_expand_empty_single_object_is_null() {
        let body = expand(&block(), &map(json!({"url": "u", "cause_field": []})));
        assert_eq!(body["cause_field"], Value::Null);
    }

    #[test]
    fn test_expand_changes_is_sparse() {
        let prior = map(json!({
            "id": "1", "url": "u", "ssl_expiration": 14, "paused": false,
            "body_template": "{\"a\":1}", "regions": ["us", "eu"]
        }));
        let config = map(json!({
            "url": "u", "ssl_expiration": -1, "paused": false,
            "body_template": "{ \"a\": 1 }", "regions": ["eu", "us"]
        }));
        let body = expand_changes(&block(), &prior, &config);
        assert_eq!(Value::Object(body), json!({"ssl_expiration": null}));
    }

    #[test]
    fn test_expand_changes_clears_removed_attribute() {
        let prior = map(json!({"url": "u", "cause_field": [{"name": "Cause"}]}));
        let config = map(json!({"url": "u"}));
        let body = expand_changes(&block(), &prior, &config);
        assert_eq!(body["cause_field"], Value::Null);
        assert_eq!(body["paused"], json!(false));
    }

    #[test]
    fn test_flatten_response() {
        let attributes = map(json!({
            "url": "https://example.com",
            "ssl_expiration": null,
            "cause_field": {"name": "Cause", "special_type": "cause"},
            "attributes": [{"name": "Owner"}],
            "password": null,
            "body_template": {"b": 2, "a": 1},
            "status": "up",
            "regions": ["eu", "us"]
        }));
        let previous = map(json!({
            "url": "https://example.com",
            "password": "hunter2",
            "body_template": "{\"a\": 1, \"b\": 2}",
            "regions": ["us", "eu"]
        }));
        let state = flatten(&block(), &attributes, Some(&previous));
        assert_eq!(state["ssl_expiration"], json!(-1));
        assert_eq!(state["cause_field"], json!([{"name": "Cause", "special_type": "cause"}]));
        assert_eq!(state["attribute"], json!([{"name": "Owner"}]));
        assert_eq!(state["password"], json!("hunter2"));
        assert_eq!(state["body_template"], json!("{\"a\": 1, \"b\": 2}"));
        assert_eq!(state["regions"], json!(["us", "eu"]));
        assert_eq!(state["status"], json!("up"));
        assert!(!state.contains_key("id"));
    }

    #[test]
    fn test_flatten_missing_keys_keep_previous() {
        let previous = map(json!({"id": "9", "url": "u", "paused": true}));
        let state = flatten(&block(), &map(json!({"status": "down"})), Some(&previous));
        assert_eq!(state["id"], json!("9"));
        assert_eq!(state["url"], json!("u"));
        assert_eq!(state["paused"], json!(true));
    }

    #[test]
    fn test_flatten_changed_json_takes_server_text() {
        let previous = map(json!({"body_template": "{\"a\": 1}"}));
        let state = flatten(
            &block(),
            &map(json!({"body_template": "{\"a\": 2}"})),
            Some(&previous),
        );
        assert_eq!(state["body_template"], json!("{\"a\": 2}"));
    }
}
