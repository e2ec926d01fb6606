//! Resource Registry - Load resource definitions from JSON
//!
//! Every resource and data source type is described by embedded JSON
//! files. This module loads them once, resolves shared blocks and attribute
//! groups from `common.json`, and provides lookup functions for the rest of
//! the provider.

use crate::schema::{Attribute, Block, ProviderSchema, TypeSchema, ValueKind};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[(&str, &str)] = &[
    ("common.json", include_str!("../resources/common.json")),
    ("monitors.json", include_str!("../resources/monitors.json")),
    ("policies.json", include_str!("../resources/policies.json")),
    ("status_pages.json", include_str!("../resources/status_pages.json")),
    ("integrations.json", include_str!("../resources/integrations.json")),
    ("catalog.json", include_str!("../resources/catalog.json")),
];

/// Nested blocks deeper than this are a definition error
const MAX_BLOCK_DEPTH: usize = 8;

fn default_id_parts() -> Vec<String> {
    vec!["id".to_string()]
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    /// Terraform type name, filled in from the registry key
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Collection path, may contain `{attribute}` placeholders
    pub path: String,
    /// State attributes encoded in the import ID, joined by `/`
    #[serde(default = "default_id_parts")]
    pub id_parts: Vec<String>,
    /// Attribute groups from `common.json` merged into this resource
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(flatten)]
    pub block: Block,
}

impl ResourceDef {
    /// Names of the `{placeholder}` segments of the collection path
    pub fn path_params(&self) -> Vec<&str> {
        path_params(&self.path)
    }

    /// Collection path with placeholders filled from state or config
    pub fn collection_path(&self, values: &Map<String, Value>) -> Result<String> {
        fill_path(&self.path, values)
            .with_context(|| format!("Cannot build API path for {}", self.name))
    }

    /// Path of a single object; `values` must carry the `id`
    pub fn item_path(&self, values: &Map<String, Value>) -> Result<String> {
        let collection = self.collection_path(values)?;
        let id = values
            .get("id")
            .and_then(path_segment)
            .with_context(|| format!("{} has no id in state", self.name))?;
        Ok(format!("{}/{}", collection, urlencoding::encode(&id)))
    }

    pub fn schema(&self) -> TypeSchema {
        TypeSchema {
            version: 0,
            description: self.description.clone(),
            block: self.block.clone(),
        }
    }
}

/// Data source definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceDef {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Resource whose attributes this data source exposes
    #[serde(default)]
    pub resource: Option<String>,
    /// Collection path, defaults to the resource's
    #[serde(default)]
    pub path: Option<String>,
    /// Attribute compared against every listed item
    pub search: String,
    /// Query parameter narrowing the listing server-side
    #[serde(default)]
    pub query_param: Option<String>,
    /// Boolean attribute selecting the default item when `search` is unset
    #[serde(default)]
    pub default_flag: Option<String>,
    /// Attributes added to (or, without a resource, defining) the schema
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    /// Effective schema, built at load time
    #[serde(skip)]
    pub block: Block,
}

impl DataSourceDef {
    /// Collection path to search
    pub fn collection_path(&self, values: &Map<String, Value>) -> Result<String> {
        let template = match (&self.path, &self.resource) {
            (Some(path), _) => path.as_str(),
            (None, Some(resource)) => get_resource(resource)
                .map(|r| r.path.as_str())
                .with_context(|| format!("Unknown resource {}", resource))?,
            (None, None) => anyhow::bail!("{} has no collection path", self.name),
        };
        fill_path(template, values).with_context(|| format!("Cannot build API path for {}", self.name))
    }

    pub fn schema(&self) -> TypeSchema {
        TypeSchema {
            version: 0,
            description: self.description.clone(),
            block: self.block.clone(),
        }
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceConfig {
    /// Shared nested blocks, referenced with `block_ref`
    #[serde(default)]
    pub blocks: BTreeMap<String, Block>,
    /// Shared attribute sets, referenced with `include`
    #[serde(default)]
    pub attribute_groups: BTreeMap<String, BTreeMap<String, Attribute>>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDef>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, DataSourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        build_registry(RESOURCE_FILES)
            .unwrap_or_else(|e| panic!("Failed to load embedded resource definitions: {:#}", e))
    })
}

/// Merge and resolve a set of definition files
pub fn build_registry(files: &[(&str, &str)]) -> Result<ResourceConfig> {
    let mut merged = ResourceConfig::default();

    for (file, content) in files {
        let partial: ResourceConfig =
            serde_json::from_str(content).with_context(|| format!("Failed to parse {}", file))?;
        merged.blocks.extend(partial.blocks);
        merged.attribute_groups.extend(partial.attribute_groups);
        for (name, def) in partial.resources {
            if merged.resources.insert(name.clone(), def).is_some() {
                anyhow::bail!("Resource {} is defined twice", name);
            }
        }
        for (name, def) in partial.data_sources {
            if merged.data_sources.insert(name.clone(), def).is_some() {
                anyhow::bail!("Data source {} is defined twice", name);
            }
        }
    }

    let shared = merged.blocks.clone();
    for block in merged.blocks.values_mut() {
        resolve_refs(&mut block.attributes, &shared, 0)?;
    }
    let shared = merged.blocks.clone();

    for (name, def) in merged.resources.iter_mut() {
        def.name = name.clone();
        for group in &def.include {
            let attributes = merged
                .attribute_groups
                .get(group)
                .with_context(|| format!("{} includes unknown group {}", name, group))?;
            for (attr_name, attr) in attributes {
                def.block
                    .attributes
                    .entry(attr_name.clone())
                    .or_insert_with(|| attr.clone());
            }
        }
        resolve_refs(&mut def.block.attributes, &shared, 0)
            .with_context(|| format!("Invalid definition of {}", name))?;
        for param in path_params(&def.path) {
            if !def.block.attributes.contains_key(param) {
                anyhow::bail!("{} path uses undefined attribute {}", name, param);
            }
        }
        for part in &def.id_parts {
            if part != "id" && !def.block.attributes.contains_key(part) {
                anyhow::bail!("{} import ID uses undefined attribute {}", name, part);
            }
        }
        def.block
            .attributes
            .insert("id".to_string(), Attribute::computed_string());
    }

    let resources = merged.resources.clone();
    for (name, def) in merged.data_sources.iter_mut() {
        def.name = name.clone();
        resolve_refs(&mut def.attributes, &shared, 0)
            .with_context(|| format!("Invalid definition of {}", name))?;
        def.block = data_source_block(def, &resources)
            .with_context(|| format!("Invalid definition of {}", name))?;
    }

    Ok(merged)
}

/// Replace every `block_ref` with a copy of the shared block
fn resolve_refs(
    attributes: &mut BTreeMap<String, Attribute>,
    shared: &BTreeMap<String, Block>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_BLOCK_DEPTH {
        anyhow::bail!("Nested blocks exceed {} levels", MAX_BLOCK_DEPTH);
    }

    for (name, attr) in attributes.iter_mut() {
        if let Some(reference) = attr.block_ref.take() {
            let block = shared
                .get(&reference)
                .with_context(|| format!("{} references unknown block {}", name, reference))?;
            attr.block = Some(block.clone());
        }
        if let Some(block) = attr.block.as_mut() {
            if !matches!(attr.kind, ValueKind::List | ValueKind::Set) {
                anyhow::bail!("{} has a nested block but is not a list or set", name);
            }
            resolve_refs(&mut block.attributes, shared, depth + 1)?;
        }
    }
    Ok(())
}

/// Schema of a data source: the backing resource read-only, with the search
/// attribute and parent path parameters as inputs
fn data_source_block(
    def: &DataSourceDef,
    resources: &BTreeMap<String, ResourceDef>,
) -> Result<Block> {
    let mut block = match &def.resource {
        Some(resource) => {
            let resource = resources
                .get(resource)
                .with_context(|| format!("Unknown resource {}", resource))?;
            let mut block = resource.block.as_computed();
            for param in resource.path_params() {
                if let Some(attr) = block.attributes.get_mut(param) {
                    attr.computed = false;
                    attr.required = true;
                }
            }
            block
        },
        None => Block::new(),
    };

    for (name, attr) in &def.attributes {
        block.attributes.insert(name.clone(), attr.clone());
    }

    let search = block
        .attributes
        .get_mut(&def.search)
        .with_context(|| format!("Search attribute {} is not defined", def.search))?;
    search.computed = def.default_flag.is_some();
    search.required = def.default_flag.is_none();
    search.optional = def.default_flag.is_some();

    block
        .attributes
        .insert("id".to_string(), Attribute::computed_string());
    Ok(block)
}

fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .collect()
}

fn path_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Replace `{name}` segments with URL-encoded values
fn fill_path(template: &str, values: &Map<String, Value>) -> Result<String> {
    let segments = template
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(param) => values
                .get(param)
                .and_then(path_segment)
                .map(|v| urlencoding::encode(&v).into_owned())
                .with_context(|| format!("{} must be set", param)),
            None => Ok(segment.to_string()),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}

/// Get a resource definition by type name
pub fn get_resource(name: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(name)
}

/// Get a data source definition by type name
pub fn get_data_source(name: &str) -> Option<&'static DataSourceDef> {
    get_registry().data_sources.get(name)
}

/// All resource type names, sorted
pub fn all_resource_names() -> Vec<&'static str> {
    get_registry().resources.keys().map(|s| s.as_str()).collect()
}

/// All data source type names, sorted
pub fn all_data_source_names() -> Vec<&'static str> {
    get_registry()
        .data_sources
        .keys()
        .map(|s| s.as_str())
        .collect()
}

/// The full provider schema
pub fn provider_schema() -> ProviderSchema {
    let registry = get_registry();
    ProviderSchema {
        provider: ProviderSchema::provider_block(),
        resources: registry
            .resources
            .iter()
            .map(|(name, def)| (name.clone(), def.schema()))
            .collect(),
        data_sources: registry
            .data_sources
            .iter()
            .map(|(name, def)| (name.clone(), def.schema()))
            .collect(),
    }
}
