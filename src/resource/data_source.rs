//! Data source lookup
//!
//! Data sources find exactly one object by comparing an attribute against
//! every item of a paginated collection.

use super::mapping;
use super::registry::DataSourceDef;
use crate::api::client::object_id;
use crate::api::pagination::pages;
use crate::api::ApiClient;
use anyhow::{Context, Result};
use futures::TryStreamExt;
use serde_json::{Map, Value};

/// What an item has to match
enum Criterion<'a> {
    /// `search` attribute equal to the configured value
    Equals(&'a str, String),
    /// `default_flag` attribute set to true
    Default(&'a str),
}

impl Criterion<'_> {
    fn matches(&self, attributes: &Map<String, Value>) -> bool {
        match self {
            Criterion::Equals(key, wanted) => attributes
                .get(*key)
                .and_then(value_text)
                .is_some_and(|v| &v == wanted),
            Criterion::Default(key) => attributes.get(*key).and_then(Value::as_bool) == Some(true),
        }
    }

    fn describe(&self) -> String {
        match self {
            Criterion::Equals(key, wanted) => format!("{} {:?}", key, wanted),
            Criterion::Default(key) => format!("{} = true", key),
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Search key in API payloads
fn search_key(def: &DataSourceDef) -> &str {
    def.block
        .get(&def.search)
        .map(|attr| attr.api_key(&def.search))
        .unwrap_or(&def.search)
}

/// Look up the single object matching the configuration
pub async fn read_data_source(
    client: &ApiClient,
    def: &DataSourceDef,
    config: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let wanted = config.get(&def.search).and_then(value_text);

    let criterion = match (&wanted, &def.default_flag) {
        (Some(wanted), _) => Criterion::Equals(search_key(def), wanted.clone()),
        (None, Some(flag)) => Criterion::Default(flag.as_str()),
        (None, None) => anyhow::bail!("{} must be set", def.search),
    };

    let mut path = def.collection_path(config)?;
    if let (Some(param), Some(wanted)) = (&def.query_param, &wanted) {
        path = format!("{}?{}={}", path, param, urlencoding::encode(wanted));
    }

    tracing::debug!("Looking up {} with {}", def.name, criterion.describe());

    let mut found: Option<Value> = None;
    let mut stream = Box::pin(pages(client, &path));
    while let Some(page) = stream
        .try_next()
        .await
        .with_context(|| format!("Failed to list {}", def.name))?
    {
        for item in page.data {
            let matched = item
                .get("attributes")
                .and_then(Value::as_object)
                .is_some_and(|attributes| criterion.matches(attributes));
            if !matched {
                continue;
            }
            if found.is_some() {
                anyhow::bail!(
                    "Multiple {} objects match {}, use a more specific filter",
                    def.name,
                    criterion.describe()
                );
            }
            found = Some(item);
        }
    }

    let item = found.with_context(|| {
        format!("There are no {} objects with {}", def.name, criterion.describe())
    })?;

    let id = object_id(&item).with_context(|| format!("{} item has no id", def.name))?;
    let empty = Map::new();
    let attributes = item
        .get("attributes")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut state = mapping::flatten(&def.block, attributes, Some(config));
    state.insert("id".to_string(), Value::String(id));
    Ok(state)
}
