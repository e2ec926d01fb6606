//! HTTP utilities for Uptime REST API calls

use super::auth::ApiToken;
use super::error::ApiError;
use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Pull a readable message out of an error response body.
///
/// The API answers failures with `{"errors": ...}` where the payload is a
/// string, a list of strings, or an object mapping attribute names to lists
/// of messages.
pub(crate) fn extract_error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return sanitize_for_log(body);
    };

    let errors = parsed.get("errors").unwrap_or(&parsed);
    match errors {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_message)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(fields) if parsed.get("errors").is_some() => fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, render_message(messages)))
            .collect::<Vec<_>>()
            .join("; "),
        _ => sanitize_for_log(body),
    }
}

fn render_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_message)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// HTTP client wrapper for Uptime API calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, token: &ApiToken) -> Result<Value> {
        self.execute(Method::GET, url, token, None).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: &str, token: &ApiToken, body: &Value) -> Result<Value> {
        self.execute(Method::POST, url, token, Some(body)).await
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch(&self, url: &str, token: &ApiToken, body: &Value) -> Result<Value> {
        self.execute(Method::PATCH, url, token, Some(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: &ApiToken) -> Result<Value> {
        self.execute(Method::DELETE, url, token, None).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        token: &ApiToken,
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request: RequestBuilder = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token.expose());

        if let Some(body) = body {
            request = request.json(body);
        }

        let path = reqwest::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());

        let response = request.send().await.map_err(|source| ApiError::Transport {
            method: method.to_string(),
            path: path.clone(),
            source,
        })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|source| ApiError::Transport {
            method: method.to_string(),
            path: path.clone(),
            source,
        })?;

        if !status.is_success() {
            // Only the sanitized/truncated body reaches the log
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiError::Status {
                status,
                method: method.to_string(),
                path,
                message: extract_error_message(&response_body),
            }
            .into());
        }

        // DELETE answers 204, some PATCH calls answer with an empty body
        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let value = serde_json::from_str(&response_body).map_err(|source| ApiError::Decode {
            method: method.to_string(),
            path,
            source,
        })?;
        Ok(value)
    }
}
