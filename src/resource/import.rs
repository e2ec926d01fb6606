//! Resource import
//!
//! Nested resources are imported with composite IDs such as
//! `<status_page_id>/<id>`; the parts seed the state before the first read.

use super::crud;
use super::registry::ResourceDef;
use crate::api::ApiClient;
use crate::schema::ValueKind;
use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Human-readable form of the expected import ID
pub fn import_format(def: &ResourceDef) -> String {
    def.id_parts
        .iter()
        .map(|part| format!("<{}>", part))
        .collect::<Vec<_>>()
        .join("/")
}

/// Split an import ID into the state attributes it encodes
pub fn parse_import_id(def: &ResourceDef, import_id: &str) -> Result<Map<String, Value>> {
    let parts: Vec<&str> = import_id.split('/').collect();

    if parts.len() != def.id_parts.len() || parts.iter().any(|p| p.trim().is_empty()) {
        anyhow::bail!(
            "Invalid import ID {:?} for {}, expected {}",
            import_id,
            def.name,
            import_format(def)
        );
    }

    let mut state = Map::new();
    for (name, raw) in def.id_parts.iter().zip(parts) {
        let raw = raw.trim();
        let is_int = name != "id"
            && def
                .block
                .get(name)
                .is_some_and(|attr| attr.kind == ValueKind::Int);

        let value = if is_int {
            let parsed: i64 = raw.parse().with_context(|| {
                format!("{} in import ID {:?} must be a number", name, import_id)
            })?;
            Value::from(parsed)
        } else {
            Value::String(raw.to_string())
        };
        state.insert(name.clone(), value);
    }

    Ok(state)
}

/// Import an existing remote object into state
pub async fn import(client: &ApiClient, def: &ResourceDef, import_id: &str) -> Result<Map<String, Value>> {
    let seed = parse_import_id(def, import_id)?;
    tracing::info!("Importing {} {}", def.name, import_id);

    crud::read(client, def, &seed).await?.with_context(|| {
        format!(
            "Cannot import non-existent remote object: {} {}",
            def.name, import_id
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::get_resource;
    use serde_json::json;

    #[test]
    fn test_simple_import_id() {
        let def = get_resource("betteruptime_monitor").unwrap();
        let state = parse_import_id(def, "123").unwrap();
        assert_eq!(Value::Object(state), json!({"id": "123"}));
    }

    #[test]
    fn test_composite_import_id() {
        let def = get_resource("betteruptime_status_page_section").unwrap();
        assert_eq!(import_format(def), "<status_page_id>/<id>");
        let state = parse_import_id(def, "42/7").unwrap();
        assert_eq!(Value::Object(state), json!({"status_page_id": 42, "id": "7"}));
    }

    #[test]
    fn test_composite_import_id_wrong_arity() {
        let def = get_resource("betteruptime_status_page_section").unwrap();
        let err = parse_import_id(def, "42").unwrap_err();
        assert!(err.to_string().contains("<status_page_id>/<id>"));
        assert!(parse_import_id(def, "42/7/1").is_err());
        assert!(parse_import_id(def, "42/").is_err());
    }

    #[test]
    fn test_composite_import_id_non_numeric_parent() {
        let def = get_resource("betteruptime_catalog_attribute").unwrap();
        let err = parse_import_id(def, "abc/7").unwrap_err();
        assert!(err.to_string().contains("relation_id"));
    }
}
