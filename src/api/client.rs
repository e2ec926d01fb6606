//! Uptime API Client
//!
//! Main client for the Better Stack Uptime REST API, combining the
//! configured base URL, authentication and HTTP functionality.

use super::auth::ApiToken;
use super::error::ApiError;
use super::http::HttpClient;
use crate::config::ResolvedConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Main API client
#[derive(Clone)]
pub struct ApiClient {
    pub http: HttpClient,
    base_url: Url,
    token: ApiToken,
}

impl ApiClient {
    /// Create a new client from resolved provider configuration
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let http = HttpClient::new(&config.user_agent, config.request_timeout)?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            token: config.api_token.clone(),
        })
    }

    /// Build an absolute URL for an API path such as `/api/v2/monitors`
    pub fn endpoint(&self, path: &str) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))?;
        Ok(url.to_string())
    }

    /// Make a GET request for an API path
    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path)?;
        self.http.get(&url, &self.token).await
    }

    /// Make a GET request for an absolute URL returned by the API
    ///
    /// Only links on the configured origin are followed, the bearer token
    /// must never be sent to another host.
    pub async fn get_url(&self, link: &str) -> Result<Value> {
        let url = self.validate_link(link)?;
        self.http.get(url.as_str(), &self.token).await
    }

    /// Make a POST request for an API path
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint(path)?;
        self.http.post(&url, &self.token, body).await
    }

    /// Make a PATCH request for an API path
    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint(path)?;
        self.http.patch(&url, &self.token, body).await
    }

    /// Make a DELETE request for an API path
    pub async fn delete(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path)?;
        self.http.delete(&url, &self.token).await
    }

    /// Resolve a pagination link and check it shares the base URL origin
    pub fn validate_link(&self, link: &str) -> Result<Url> {
        let url = self
            .base_url
            .join(link)
            .with_context(|| format!("Invalid pagination link: {}", link))?;

        if url.origin() != self.base_url.origin() {
            return Err(ApiError::InvalidNextLink {
                link: link.to_string(),
                base: self.base_url.to_string(),
            }
            .into());
        }

        Ok(url)
    }
}

/// Extract `data` from a single-object response
pub fn response_data<'a>(response: &'a Value, path: &str) -> Result<&'a Value> {
    response
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| ApiError::MissingData { path: path.to_string() }.into())
}

/// Extract the string ID of an API object; the API sends IDs as strings
/// but older endpoints answer with numbers
pub fn object_id(data: &Value) -> Option<String> {
    match data.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
