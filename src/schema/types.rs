//! Schema types shared by resources, data sources and the provider block

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Terraform value kinds understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Int,
    Float,
    Bool,
    List,
    Set,
    Map,
}

impl ValueKind {
    pub fn is_collection(self) -> bool {
        matches!(self, ValueKind::List | ValueKind::Set | ValueKind::Map)
    }

    /// Check a JSON value against a scalar kind
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Int => value.as_i64().is_some(),
            ValueKind::Float => value.is_number(),
            ValueKind::Bool => value.is_boolean(),
            ValueKind::List | ValueKind::Set => value.is_array(),
            ValueKind::Map => value.is_object(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single attribute of a schema block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Scalar element kind of a list, set or map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elem: Option<ValueKind>,
    /// Nested object element of a list or set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
    /// Name of a shared block in `common.json`, resolved at load time
    #[serde(default, skip_serializing)]
    pub block_ref: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_new: bool,
    /// Integer where `-1` stands for an explicit API null
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// String holding a JSON document; diffs compare the parsed value
    #[serde(default, skip_serializing_if = "is_false")]
    pub json: bool,
    /// The API never echoes this attribute back
    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,
    /// String in `HH:MM:SS` form
    #[serde(default, skip_serializing_if = "is_false")]
    pub time_of_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Value>,
    /// Key used in API payloads when it differs from the attribute name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Attribute {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            elem: None,
            block: None,
            block_ref: None,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            force_new: false,
            nullable: false,
            json: false,
            write_only: false,
            time_of_day: false,
            max_items: None,
            default: None,
            one_of: Vec::new(),
            api_name: None,
            description: String::new(),
        }
    }

    pub fn required_string() -> Self {
        Self::new(ValueKind::String).required()
    }

    pub fn optional_string() -> Self {
        Self::new(ValueKind::String).optional()
    }

    pub fn computed_string() -> Self {
        Self::new(ValueKind::String).computed()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_elem(mut self, elem: ValueKind) -> Self {
        self.elem = Some(elem);
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.block = Some(block);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Users may set the attribute in configuration
    pub fn is_settable(&self) -> bool {
        self.required || self.optional || !self.computed
    }

    /// Nested block stored as a list of one in state and an object in the API
    pub fn is_single_object(&self) -> bool {
        self.block.is_some() && self.max_items == Some(1)
    }

    /// Key of this attribute in API payloads
    pub fn api_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.api_name.as_deref().unwrap_or(name)
    }

    /// Copy of this attribute as it appears in a data source: everything is
    /// read from the API
    pub fn as_computed(&self) -> Self {
        let mut attr = self.clone();
        attr.required = false;
        attr.optional = false;
        attr.computed = true;
        attr.force_new = false;
        attr.default = None;
        attr.block = attr.block.map(|b| b.as_computed());
        attr
    }
}

/// A set of named attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn as_computed(&self) -> Self {
        Self {
            attributes: self
                .attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.as_computed()))
                .collect(),
        }
    }
}

/// Schema of one resource or data source type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSchema {
    pub version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub block: Block,
}

/// Full schema advertised by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSchema {
    pub provider: Block,
    pub resources: BTreeMap<String, TypeSchema>,
    pub data_sources: BTreeMap<String, TypeSchema>,
}

impl ProviderSchema {
    /// Schema of the provider block itself
    pub fn provider_block() -> Block {
        Block::new()
            .with_attribute(
                "api_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Uptime API token; falls back to BETTERUPTIME_API_TOKEN"),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string()
                    .with_description("Base URL of the Uptime API"),
            )
            .with_attribute(
                "request_timeout",
                Attribute::new(ValueKind::Int)
                    .optional()
                    .with_description("Per-request timeout in seconds"),
            )
            .with_attribute(
                "user_agent_suffix",
                Attribute::optional_string(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_deserializes_with_defaults() {
        let attr: Attribute = serde_json::from_value(json!({
            "type": "int",
            "optional": true,
            "computed": true,
            "nullable": true
        }))
        .unwrap();
        assert_eq!(attr.kind, ValueKind::Int);
        assert!(attr.nullable);
        assert!(attr.is_settable());
        assert!(!attr.required);
    }

    #[test]
    fn test_computed_only_is_not_settable() {
        assert!(!Attribute::computed_string().is_settable());
        assert!(Attribute::required_string().is_settable());
    }

    #[test]
    fn test_api_key_rename() {
        let mut attr = Attribute::optional_string();
        assert_eq!(attr.api_key("attribute"), "attribute");
        attr.api_name = Some("attributes".to_string());
        assert_eq!(attr.api_key("attribute"), "attributes");
    }

    #[test]
    fn test_as_computed_strips_requirements() {
        let block = Block::new().with_attribute(
            "rule",
            Attribute::new(ValueKind::List)
                .optional()
                .with_block(Block::new().with_attribute("content", Attribute::required_string())),
        );
        let computed = block.as_computed();
        let rule = computed.get("rule").unwrap();
        assert!(rule.computed && !rule.optional);
        let content = rule.block.as_ref().unwrap().get("content").unwrap();
        assert!(content.computed && !content.required);
    }

    #[test]
    fn test_serialize_skips_false_flags() {
        let value = serde_json::to_value(Attribute::required_string()).unwrap();
        assert_eq!(value, json!({"type": "string", "required": true}));
    }
}
