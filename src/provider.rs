//! Provider operations
//!
//! Every protocol call lands here: type names are resolved against the
//! registry, configuration is validated, and the generic engine in
//! [`crate::resource`] talks to the API. Failures never escape as errors;
//! they come back as diagnostics inside an [`Outcome`].

use crate::api::ApiClient;
use crate::config::ProviderConfig;
use crate::diagnostics::{has_errors, Diagnostic, Outcome};
use crate::resource::{
    crud, data_source, get_data_source, get_resource, import, provider_schema, DataSourceDef,
    ResourceDef,
};
use crate::schema::{self, values_equal, Plan, ProviderSchema};
use anyhow::Result;
use serde_json::{Map, Value};

pub struct Provider {
    client: Option<ApiClient>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    /// An unconfigured provider; only schema and validation calls work
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Provider talking to an already built client
    pub fn with_client(client: ApiClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Build a configured provider from the provider block
    pub fn configure(config: ProviderConfig) -> Result<Self> {
        let resolved = config.resolve()?;
        tracing::info!(
            "Configured provider for {} (timeout {:?})",
            resolved.api_url,
            resolved.request_timeout
        );
        Ok(Self::with_client(ApiClient::new(&resolved)?))
    }

    /// Configure from a raw provider block, replacing any previous client
    pub fn configure_from_value(&mut self, config: &Value) -> Vec<Diagnostic> {
        let block = match config {
            Value::Null => Map::new(),
            Value::Object(object) => object.clone(),
            _ => {
                return vec![Diagnostic::error("Invalid provider configuration")
                    .with_detail("The provider block must be an object.")]
            },
        };

        let diagnostics = schema::validate(&ProviderSchema::provider_block(), &block);
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let result = serde_json::from_value::<ProviderConfig>(Value::Object(block))
            .map_err(anyhow::Error::from)
            .and_then(Self::configure);

        match result {
            Ok(configured) => {
                self.client = configured.client;
                diagnostics
            },
            Err(err) => {
                tracing::error!("Provider configuration failed: {:#}", err);
                let mut diagnostics = diagnostics;
                diagnostics.push(Diagnostic::from_error(&err));
                diagnostics
            },
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn schema(&self) -> ProviderSchema {
        provider_schema()
    }

    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Map<String, Value>,
    ) -> Vec<Diagnostic> {
        match resource_def(type_name) {
            Ok(def) => schema::validate(&def.block, config),
            Err(diagnostic) => vec![diagnostic],
        }
    }

    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Map<String, Value>,
    ) -> Vec<Diagnostic> {
        let def = match data_source_def(type_name) {
            Ok(def) => def,
            Err(diagnostic) => return vec![diagnostic],
        };
        let mut diagnostics = schema::validate(&def.block, config);
        if let Some(flag) = &def.default_flag {
            if config.get(flag).is_some_and(|v| !v.is_null()) {
                diagnostics.push(
                    Diagnostic::error("Value for unconfigurable attribute")
                        .with_detail(format!("\"{}\" is read from the API.", flag))
                        .at(flag.as_str()),
                );
            }
        }
        diagnostics
    }

    /// Plan a change; `config` of `None` plans a destroy and yields no state
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Map<String, Value>>,
        config: Option<&Map<String, Value>>,
    ) -> Outcome<Option<Plan>> {
        let def = match resource_def(type_name) {
            Ok(def) => def,
            Err(diagnostic) => return Outcome::failed(vec![diagnostic]),
        };
        let Some(config) = config else {
            return Outcome::ok(None);
        };

        let diagnostics = schema::validate(&def.block, config);
        if has_errors(&diagnostics) {
            return Outcome::failed(diagnostics);
        }

        let plan = schema::plan(&def.block, prior, config);
        tracing::debug!(
            "Planned {}: {} change(s), replace on {:?}",
            type_name,
            plan.changes.len(),
            plan.requires_replace
        );
        Outcome::ok(Some(plan)).with_diagnostics(diagnostics)
    }

    /// Apply a planned change
    ///
    /// No prior state creates, no planned state deletes, both update in
    /// place unless a `force_new` attribute changed.
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Map<String, Value>>,
        planned: Option<&Map<String, Value>>,
    ) -> Outcome<Option<Map<String, Value>>> {
        let (def, client) = match self.resource_and_client(type_name) {
            Ok(pair) => pair,
            Err(diagnostic) => return Outcome::failed(vec![diagnostic]),
        };

        let result = match (prior, planned) {
            (None, None) => Ok(None),
            (None, Some(planned)) => crud::create(client, def, planned).await.map(Some),
            (Some(prior), None) => crud::delete(client, def, prior).await.map(|_| None),
            (Some(prior), Some(planned)) if requires_replace(def, prior, planned) => {
                let id = prior.get("id").cloned().unwrap_or_default();
                tracing::info!("Replacing {} {}", type_name, id);
                replace(client, def, prior, planned).await.map(Some)
            },
            (Some(prior), Some(planned)) => crud::update(client, def, prior, planned).await.map(Some),
        };
        Outcome::from_result(result)
    }

    /// Refresh state; a `None` result means the object is gone
    pub async fn read_resource(
        &self,
        type_name: &str,
        state: &Map<String, Value>,
    ) -> Outcome<Option<Map<String, Value>>> {
        match self.resource_and_client(type_name) {
            Ok((def, client)) => Outcome::from_result(crud::read(client, def, state).await),
            Err(diagnostic) => Outcome::failed(vec![diagnostic]),
        }
    }

    pub async fn import_resource_state(
        &self,
        type_name: &str,
        import_id: &str,
    ) -> Outcome<Map<String, Value>> {
        match self.resource_and_client(type_name) {
            Ok((def, client)) => Outcome::from_result(import::import(client, def, import_id).await),
            Err(diagnostic) => Outcome::failed(vec![diagnostic]),
        }
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &Map<String, Value>,
    ) -> Outcome<Map<String, Value>> {
        let diagnostics = self.validate_data_source_config(type_name, config);
        if has_errors(&diagnostics) {
            return Outcome::failed(diagnostics);
        }
        let (def, client) = match data_source_def(type_name)
            .and_then(|def| self.client().map(|client| (def, client)))
        {
            Ok(pair) => pair,
            Err(diagnostic) => return Outcome::failed(vec![diagnostic]),
        };
        Outcome::from_result(data_source::read_data_source(client, def, config).await)
            .with_diagnostics(diagnostics)
    }

    fn client(&self) -> Result<&ApiClient, Diagnostic> {
        self.client.as_ref().ok_or_else(|| {
            Diagnostic::error("Provider not configured")
                .with_detail("ConfigureProvider must succeed before resources can be managed.")
        })
    }

    fn resource_and_client(
        &self,
        type_name: &str,
    ) -> Result<(&'static ResourceDef, &ApiClient), Diagnostic> {
        let def = resource_def(type_name)?;
        Ok((def, self.client()?))
    }
}

fn resource_def(type_name: &str) -> Result<&'static ResourceDef, Diagnostic> {
    get_resource(type_name).ok_or_else(|| {
        Diagnostic::error("Unknown resource type")
            .with_detail(format!("This provider does not support resource type \"{}\".", type_name))
    })
}

fn data_source_def(type_name: &str) -> Result<&'static DataSourceDef, Diagnostic> {
    get_data_source(type_name).ok_or_else(|| {
        Diagnostic::error("Unknown data source")
            .with_detail(format!("This provider does not support data source \"{}\".", type_name))
    })
}

async fn replace(
    client: &ApiClient,
    def: &ResourceDef,
    prior: &Map<String, Value>,
    planned: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    crud::delete(client, def, prior).await?;
    crud::create(client, def, planned).await
}

/// True if a `force_new` attribute differs between prior and planned state
fn requires_replace(def: &ResourceDef, prior: &Map<String, Value>, planned: &Map<String, Value>) -> bool {
    def.block.attributes.iter().any(|(name, attr)| {
        if !attr.force_new {
            return false;
        }
        let before = prior.get(name).unwrap_or(&Value::Null);
        let after = planned.get(name).unwrap_or(&Value::Null);
        !values_equal(attr, before, after)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_unknown_resource_type() {
        let provider = Provider::new();
        let diags = provider.validate_resource_config("betteruptime_nope", &Map::new());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unknown resource type");
    }

    #[test]
    fn test_validate_monitor_config() {
        let provider = Provider::new();
        let diags = provider.validate_resource_config(
            "betteruptime_monitor",
            &map(json!({"url": "https://example.com", "monitor_type": "status"})),
        );
        assert!(diags.is_empty(), "{:?}", diags);

        let diags = provider.validate_resource_config(
            "betteruptime_monitor",
            &map(json!({"monitor_type": "status"})),
        );
        assert_eq!(diags[0].attribute.as_deref(), Some("url"));
    }

    #[test]
    fn test_default_flag_cannot_be_configured() {
        let provider = Provider::new();
        let diags = provider.validate_data_source_config(
            "betteruptime_on_call_calendar",
            &map(json!({"default_calendar": true})),
        );
        assert!(has_errors(&diags));
    }

    #[test]
    fn test_plan_destroy_has_no_state() {
        let provider = Provider::new();
        let prior = map(json!({"id": "1", "name": "web"}));
        let outcome = provider.plan_resource_change("betteruptime_monitor_group", Some(&prior), None);
        assert!(!outcome.has_errors());
        assert!(matches!(outcome.result, Some(None)));
    }

    #[test]
    fn test_plan_rejects_invalid_config() {
        let provider = Provider::new();
        let outcome = provider.plan_resource_change(
            "betteruptime_monitor_group",
            None,
            Some(&map(json!({"name": 5}))),
        );
        assert!(outcome.has_errors());
        assert!(outcome.result.is_none());
    }

    #[test]
    fn test_plan_parent_change_requires_replace() {
        let provider = Provider::new();
        let prior = map(json!({"id": "3", "status_page_id": 1, "name": "APIs", "position": 0}));
        let config = map(json!({"status_page_id": 2, "name": "APIs"}));
        let outcome = provider.plan_resource_change(
            "betteruptime_status_page_section",
            Some(&prior),
            Some(&config),
        );
        let plan = outcome.result.flatten().unwrap();
        assert_eq!(plan.requires_replace, vec!["status_page_id".to_string()]);
    }

    #[test]
    fn test_requires_replace_ignores_regular_attributes() {
        let def = get_resource("betteruptime_status_page_section").unwrap();
        let prior = map(json!({"id": "3", "status_page_id": 1, "name": "A"}));
        assert!(!requires_replace(def, &prior, &map(json!({"status_page_id": 1, "name": "B"}))));
        assert!(requires_replace(def, &prior, &map(json!({"status_page_id": 9, "name": "A"}))));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_reports_diagnostic() {
        let provider = Provider::new();
        let outcome = provider
            .read_resource("betteruptime_monitor", &map(json!({"id": "1"})))
            .await;
        assert!(outcome.has_errors());
        assert_eq!(outcome.diagnostics[0].summary, "Provider not configured");
    }

    #[test]
    fn test_configure_rejects_unknown_attribute() {
        let mut provider = Provider::new();
        let diags = provider.configure_from_value(&json!({"api_token": "t", "region": "eu"}));
        assert!(has_errors(&diags));
        assert!(!provider.is_configured());
    }

    #[test]
    fn test_configure_with_token() {
        let mut provider = Provider::new();
        let diags = provider.configure_from_value(&json!({
            "api_token": "secret-token",
            "api_url": "https://uptime.example.com"
        }));
        assert!(!has_errors(&diags), "{:?}", diags);
        assert!(provider.is_configured());
    }
}
