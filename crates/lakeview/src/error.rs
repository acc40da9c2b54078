//! Error types for Lakeview API operations.
//!
//! The service answers failures with a JSON body of the shape
//! `{"error_code": "...", "message": "..."}`. Those fields are kept
//! structured on [`Error::Api`] so callers can classify failures by
//! [`ErrorCategory`] instead of parsing text.

use serde::Deserialize;
use std::fmt;

/// Result type alias for Lakeview operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
///
/// Categories drive recovery decisions in callers: transient errors may be
/// retried, permission errors may need disambiguation, everything else is
/// surfaced as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The addressed object (or one of its parents) does not exist.
    NotFound,
    /// The caller is not allowed to perform the operation.
    PermissionDenied,
    /// Network failures, throttling and 5xx responses.
    Transient,
    /// The request was rejected as malformed or invalid.
    InvalidRequest,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Not found",
            Self::PermissionDenied => "Permission denied",
            Self::Transient => "Transient service or network failure",
            Self::InvalidRequest => "Invalid request",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the dashboard id, warehouse id and parent path",
            Self::PermissionDenied => "Check the token's permissions on the target folder",
            Self::Transient => "Wait a moment and run the command again",
            Self::InvalidRequest => "Check the dashboard definition for invalid values",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors returned by a [`Backend`](crate::Backend).
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The service answered with an error status.
    ///
    /// Displays as the service message alone, which is what the service
    /// itself shows users.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code, when the body carried one.
        error_code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The client is missing host or credentials.
    #[error("client configuration error: {0}")]
    Config(String),
}

/// Error body as sent by the service.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

const PARENT_MISSING_PREFIX: &str = "Path (";
const PARENT_MISSING_SUFFIX: &str = ") doesn't exist.";

impl Error {
    /// Create an API error.
    pub fn api(status: u16, error_code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            error_code: error_code.map(str::to_string),
            message: message.into(),
        }
    }

    /// A 404 `RESOURCE_DOES_NOT_EXIST` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::api(404, Some("RESOURCE_DOES_NOT_EXIST"), message)
    }

    /// A 403 `PERMISSION_DENIED` error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::api(403, Some("PERMISSION_DENIED"), message)
    }

    /// The error the service returns when a dashboard's parent folder is missing.
    pub fn parent_missing(path: &str) -> Self {
        Self::not_found(format!(
            "{PARENT_MISSING_PREFIX}{path}{PARENT_MISSING_SUFFIX}"
        ))
    }

    /// Build an error from a non-success response body.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_string()
                }
            });
        Self::Api {
            status,
            error_code: parsed.error_code,
            message,
        }
    }

    /// Get the error category.
    ///
    /// The structured `error_code` wins over the HTTP status when both are
    /// present.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Api {
                status, error_code, ..
            } => error_code
                .as_deref()
                .and_then(category_for_code)
                .unwrap_or_else(|| category_for_status(*status)),
            Error::Transport(_) => ErrorCategory::Transient,
            Error::InvalidResponse(_) | Error::Config(_) => ErrorCategory::Other,
        }
    }

    /// Whether the addressed object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether the caller was denied.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.category() == ErrorCategory::PermissionDenied
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// The folder reported missing when a create failed because its parent
    /// folder does not exist.
    ///
    /// The service has no dedicated error code for this case, so the
    /// structured category narrows the candidates and the message shape
    /// `Path (<path>) doesn't exist.` confirms it.
    #[must_use]
    pub fn missing_parent(&self) -> Option<&str> {
        let Error::Api { message, .. } = self else {
            return None;
        };
        if matches!(
            self.category(),
            ErrorCategory::PermissionDenied | ErrorCategory::Transient
        ) {
            return None;
        }
        message
            .strip_prefix(PARENT_MISSING_PREFIX)?
            .strip_suffix(PARENT_MISSING_SUFFIX)
    }

    /// Whether a create failed because its parent folder does not exist.
    #[must_use]
    pub fn is_parent_missing(&self) -> bool {
        self.missing_parent().is_some()
    }
}

fn category_for_code(code: &str) -> Option<ErrorCategory> {
    match code {
        "RESOURCE_DOES_NOT_EXIST" | "NOT_FOUND" => Some(ErrorCategory::NotFound),
        "PERMISSION_DENIED" | "UNAUTHENTICATED" => Some(ErrorCategory::PermissionDenied),
        "TEMPORARILY_UNAVAILABLE" | "REQUEST_LIMIT_EXCEEDED" | "DEADLINE_EXCEEDED"
        | "INTERNAL_ERROR" => Some(ErrorCategory::Transient),
        "INVALID_PARAMETER_VALUE" | "BAD_REQUEST" | "INVALID_STATE"
        | "RESOURCE_ALREADY_EXISTS" => Some(ErrorCategory::InvalidRequest),
        _ => None,
    }
}

fn category_for_status(status: u16) -> ErrorCategory {
    match status {
        404 => ErrorCategory::NotFound,
        401 | 403 => ErrorCategory::PermissionDenied,
        429 | 500..=599 => ErrorCategory::Transient,
        400 | 409 => ErrorCategory::InvalidRequest,
        _ => ErrorCategory::Other,
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Api {
                status: code,
                error_code: None,
                message: format!("HTTP {code}"),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
