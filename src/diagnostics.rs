//! Diagnostics returned to Terraform

use crate::api::error::format_api_error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem reported for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    /// Attribute path such as `started_rules.0.content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: String::new(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn at(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Convert an error into a diagnostic; the full context chain goes into
    /// the detail
    pub fn from_error(error: &anyhow::Error) -> Self {
        let detail = error
            .chain()
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join(": ");
        Self::error(format_api_error(error)).with_detail(detail)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Result of a provider operation: an optional value plus diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            result: None,
            diagnostics,
        }
    }

    pub fn from_result(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => {
                tracing::error!("{:#}", err);
                Self::failed(vec![Diagnostic::from_error(&err)])
            },
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_from_error_keeps_chain_in_detail() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = err.context("Failed to create monitor").unwrap_err();
        let diag = Diagnostic::from_error(&err);
        assert!(diag.is_error());
        assert_eq!(diag.detail, "Failed to create monitor: connection refused");
    }

    #[test]
    fn test_warning_is_not_error() {
        let diags = vec![Diagnostic::warning("deprecated")];
        assert!(!has_errors(&diags));
    }

    #[test]
    fn test_outcome_serialization_skips_missing_result() {
        let outcome: Outcome<u32> = Outcome::failed(vec![Diagnostic::error("boom").at("url")]);
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["diagnostics"][0]["attribute"], "url");
        assert_eq!(value["diagnostics"][0]["severity"], "error");
    }
}
