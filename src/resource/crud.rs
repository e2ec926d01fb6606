//! Generic create/read/update/delete
//!
//! Every resource type goes through the same four calls; only the
//! definition (path and schema) changes.

use super::mapping;
use super::registry::ResourceDef;
use crate::api::client::{object_id, response_data};
use crate::api::{is_not_found, ApiClient};
use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Remove path placeholders from a request body; they live in the URL
fn strip_path_params(def: &ResourceDef, body: &mut Map<String, Value>) {
    for param in def.path_params() {
        let key = def
            .block
            .get(param)
            .map(|attr| attr.api_key(param))
            .unwrap_or(param);
        body.remove(key);
    }
}

/// Build state from a single-object response
fn state_from_response(
    def: &ResourceDef,
    response: &Value,
    path: &str,
    previous: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let data = response_data(response, path)?;
    let id = object_id(data).with_context(|| format!("{} response has no id", def.name))?;

    let empty = Map::new();
    let attributes = data
        .get("attributes")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut state = mapping::flatten(&def.block, attributes, Some(previous));
    state.insert("id".to_string(), Value::String(id));
    Ok(state)
}

/// Create a remote object from planned state
pub async fn create(
    client: &ApiClient,
    def: &ResourceDef,
    planned: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let path = def.collection_path(planned)?;
    let mut body = mapping::expand(&def.block, planned);
    strip_path_params(def, &mut body);

    tracing::info!("Creating {} at {}", def.name, path);
    let response = client
        .post(&path, &Value::Object(body))
        .await
        .with_context(|| format!("Failed to create {}", def.name))?;

    let state = state_from_response(def, &response, &path, planned)?;
    tracing::info!("Created {} {}", def.name, state["id"]);
    Ok(state)
}

/// Refresh state from the API; `None` means the object is gone
pub async fn read(
    client: &ApiClient,
    def: &ResourceDef,
    state: &Map<String, Value>,
) -> Result<Option<Map<String, Value>>> {
    let path = def.item_path(state)?;

    match client.get(&path).await {
        Ok(response) => state_from_response(def, &response, &path, state).map(Some),
        Err(err) if is_not_found(&err) => {
            tracing::warn!("{} at {} no longer exists, removing from state", def.name, path);
            Ok(None)
        },
        Err(err) => Err(err.context(format!("Failed to read {}", def.name))),
    }
}

/// Apply the difference between prior and planned state
pub async fn update(
    client: &ApiClient,
    def: &ResourceDef,
    prior: &Map<String, Value>,
    planned: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    let path = def.item_path(prior)?;
    let mut body = mapping::expand_changes(&def.block, prior, planned);
    strip_path_params(def, &mut body);

    if body.is_empty() {
        tracing::debug!("No API-visible changes for {} {}", def.name, path);
        let mut merged = planned.clone();
        merged.insert("id".to_string(), prior.get("id").cloned().unwrap_or(Value::Null));
        return read(client, def, &merged)
            .await?
            .with_context(|| format!("{} at {} was deleted outside Terraform", def.name, path));
    }

    tracing::info!("Updating {} at {} ({} attributes)", def.name, path, body.len());
    let response = client
        .patch(&path, &Value::Object(body))
        .await
        .with_context(|| format!("Failed to update {}", def.name))?;

    let mut previous = planned.clone();
    previous.insert("id".to_string(), prior.get("id").cloned().unwrap_or(Value::Null));

    if response.is_null() {
        return read(client, def, &previous)
            .await?
            .with_context(|| format!("{} at {} was deleted outside Terraform", def.name, path));
    }
    state_from_response(def, &response, &path, &previous)
}

/// Delete the remote object; an object that is already gone is not an error
pub async fn delete(client: &ApiClient, def: &ResourceDef, state: &Map<String, Value>) -> Result<()> {
    let path = def.item_path(state)?;

    tracing::info!("Deleting {} at {}", def.name, path);
    match client.delete(&path).await {
        Ok(_) => Ok(()),
        Err(err) if is_not_found(&err) => {
            tracing::warn!("{} at {} was already deleted", def.name, path);
            Ok(())
        },
        Err(err) => Err(err.context(format!("Failed to delete {}", def.name))),
    }
}
