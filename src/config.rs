//! Configuration Management
//!
//! The provider block accepted by `ConfigureProvider`, and its resolution
//! against environment variables and the credentials file.

use crate::api::auth::{self, ApiToken, CredentialsFile};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default API endpoint
pub const DEFAULT_API_URL: &str = "https://uptime.betterstack.com";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Provider block as written in Terraform configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Uptime API token
    #[serde(default)]
    pub api_token: Option<String>,
    /// Base URL of the API
    #[serde(default)]
    pub api_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Appended to the User-Agent header
    #[serde(default)]
    pub user_agent_suffix: Option<String>,
}

/// Configuration with every fallback applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_token: ApiToken,
    pub api_url: Url,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl ProviderConfig {
    /// Resolve against the process environment and the credentials file
    ///
    /// The credentials file is only read when the provider block and the
    /// environment leave the token or the URL unset. A broken file is an
    /// error only when the token has to come from it.
    pub fn resolve(mut self) -> Result<ResolvedConfig> {
        if self.api_url.is_none() {
            self.api_url = std::env::var("BETTERUPTIME_API_URL").ok();
        }

        let explicit_token = self.api_token.as_deref().is_some_and(|t| !t.trim().is_empty());
        let env_token = if explicit_token {
            None
        } else {
            auth::get_env_token()
        };
        let token_needed = !explicit_token && env_token.is_none();

        let credentials = if token_needed {
            Some(CredentialsFile::load()?)
        } else if self.api_url.is_none() {
            match CredentialsFile::load() {
                Ok(credentials) => Some(credentials),
                Err(err) => {
                    tracing::warn!("Ignoring credentials file: {:#}", err);
                    None
                },
            }
        } else {
            None
        };

        self.resolve_with(env_token, credentials)
    }

    /// Resolve with explicit fallbacks (attribute > env > credentials file)
    pub fn resolve_with(
        self,
        env_token: Option<String>,
        credentials: Option<CredentialsFile>,
    ) -> Result<ResolvedConfig> {
        let credentials = credentials.unwrap_or_default();

        let token = self
            .api_token
            .filter(|t| !t.trim().is_empty())
            .or(env_token)
            .or(credentials.api_token)
            .context(
                "api_token must be set, either in the provider block, \
                 BETTERUPTIME_API_TOKEN, or the credentials file",
            )?;
        let api_token = ApiToken::new(&token)?;

        let raw_url = self
            .api_url
            .or(credentials.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&raw_url)?;

        let request_timeout =
            Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT));
        if request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than zero");
        }

        let mut user_agent = format!("terraform-provider-betteruptime/{}", crate::VERSION);
        if let Some(suffix) = self.user_agent_suffix.filter(|s| !s.is_empty()) {
            user_agent.push(' ');
            user_agent.push_str(&suffix);
        }

        Ok(ResolvedConfig {
            api_token,
            api_url,
            request_timeout,
            user_agent,
        })
    }
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid api_url: {}", raw))?;
    match url.scheme() {
        "http" | "https" => {},
        other => anyhow::bail!("api_url must use http or https, got {}", other),
    }
    if url.host_str().is_none() {
        anyhow::bail!("api_url must include a host: {}", raw);
    }
    Ok(url)
}
