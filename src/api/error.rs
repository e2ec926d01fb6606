//! API error types
//!
//! Errors raised by the HTTP layer carry the status code so callers can
//! recognise a vanished remote object (404) after the error has been
//! wrapped in an [`anyhow::Error`].

use reqwest::StatusCode;

/// Errors returned by the Better Stack Uptime API layer
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {path} failed with {status}: {message}")]
    Status {
        status: StatusCode,
        method: String,
        path: String,
        message: String,
    },

    #[error("{method} {path}: request failed")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path}: invalid JSON in response")]
    Decode {
        method: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pagination link {link} does not belong to {base}")]
    InvalidNextLink { link: String, base: String },

    #[error("response to {path} has no `data` object")]
    MissingData { path: String },
}

impl ApiError {
    /// HTTP status of the failed call, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Status code carried anywhere in an error chain
pub fn error_status(error: &anyhow::Error) -> Option<StatusCode> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .and_then(ApiError::status)
}

/// True if the error chain contains a 404 from the API
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error_status(error) == Some(StatusCode::NOT_FOUND)
}

/// Format an API error for a diagnostic summary
///
/// The raw server message is kept for validation failures because that is
/// the only place the user learns which attribute was rejected.
pub fn format_api_error(error: &anyhow::Error) -> String {
    let api_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>());

    let Some(ApiError::Status {
        status, message, ..
    }) = api_error
    else {
        return error.to_string();
    };

    match status.as_u16() {
        401 => "Authentication failed. Check that api_token is a valid Uptime API token.".to_string(),
        403 => "Permission denied. The API token cannot access this resource.".to_string(),
        404 => "Resource not found.".to_string(),
        409 => format!("Resource conflict: {}", message),
        422 => format!("Validation failed: {}", message),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        500..=599 => "Better Stack service temporarily unavailable. Please try again.".to_string(),
        _ => format!("Request failed with {}: {}", status, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn status_error(code: u16, message: &str) -> anyhow::Error {
        anyhow::Error::new(ApiError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            method: "GET".to_string(),
            path: "/api/v2/monitors/1".to_string(),
            message: message.to_string(),
        })
    }

    #[test]
    fn test_not_found_survives_context() {
        let err: anyhow::Result<()> = Err(status_error(404, "gone"));
        let err = err.context("Failed to read monitor").unwrap_err();
        assert!(is_not_found(&err));
    }

    #[test]
    fn test_other_status_is_not_not_found() {
        assert!(!is_not_found(&status_error(500, "boom")));
        assert!(!is_not_found(&anyhow::anyhow!("plain error")));
    }

    #[test]
    fn test_format_validation_error_keeps_message() {
        let formatted = format_api_error(&status_error(422, "url: is invalid"));
        assert_eq!(formatted, "Validation failed: url: is invalid");
    }

    #[test]
    fn test_decode_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = anyhow::Error::new(ApiError::Decode {
            method: "GET".to_string(),
            path: "/api/v2/monitors".to_string(),
            source,
        });
        assert_eq!(error_status(&err), None);
        assert!(format_api_error(&err).contains("invalid JSON"));
        assert!(std::error::Error::source(err.downcast_ref::<ApiError>().unwrap()).is_some());
    }

    #[test]
    fn test_format_auth_error_hides_details() {
        let formatted = format_api_error(&status_error(401, "token abc is bad"));
        assert!(!formatted.contains("abc"));
    }
}
