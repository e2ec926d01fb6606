//! Uptime API Authentication
//!
//! Resolves the bearer token used for every API call, either from the
//! provider block, the environment, or a credentials file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variables consulted for the API token, in order
pub const TOKEN_ENV_VARS: &[&str] = &["BETTERUPTIME_API_TOKEN", "BETTERSTACK_API_TOKEN"];

/// Bearer token for the Uptime API
///
/// `Debug` is redacted so the token cannot leak through `tracing` fields.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token after validating its format
    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        if !validate_token(token) {
            anyhow::bail!("api_token must be a non-empty string without whitespace");
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(****)")
    }
}

/// Tokens are opaque but never contain whitespace or control characters
fn validate_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_graphic())
}

/// On-disk credentials, `<config_dir>/betteruptime/credentials.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl CredentialsFile {
    /// Default location of the credentials file
    pub fn default_path() -> Option<PathBuf> {
        get_config_dir().map(|p| p.join("credentials.json"))
    }

    /// Load the credentials file; a missing file yields empty credentials
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse credentials file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Configuration directory for the provider
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BETTERUPTIME_CONFIG_DIR") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|p| p.join("betteruptime"))
}

/// Read the API token from the environment
pub fn get_env_token() -> Option<String> {
    for var in TOKEN_ENV_VARS {
        if let Ok(token) = std::env::var(var) {
            if validate_token(token.trim()) {
                return Some(token.trim().to_string());
            }
            tracing::warn!("Ignoring malformed token in {}", var);
        }
    }
    None
}
