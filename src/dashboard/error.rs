//! Error taxonomy for the dashboard lifecycle

use lakeview::ErrorCategory;
use std::path::PathBuf;

/// Result alias for lifecycle operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Errors raised while reconciling a dashboard
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Content sources are missing or conflicting. Never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A referenced content file could not be read
    #[error("cannot read dashboard content from {}", path.display())]
    ContentUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A remote call failed and no recovery step applied
    #[error(transparent)]
    Remote(#[from] lakeview::Error),

    /// Publishing failed and the compensating trash failed too, so an
    /// unpublished dashboard may be left behind.
    #[error(
        "dashboard {dashboard_id} is in an inconsistent state: publish failed ({publish_error}) and the rollback could not trash it"
    )]
    InconsistentState {
        dashboard_id: String,
        publish_error: String,
        #[source]
        source: lakeview::Error,
    },
}

impl ControllerError {
    /// Remote error category, when the failure came from the service
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Remote(e) | Self::InconsistentState { source: e, .. } => Some(e.category()),
            Self::Configuration(_) | Self::ContentUnavailable { .. } => None,
        }
    }

    /// Whether rerunning the same operation could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_retryable())
    }

    /// Actionable hint for the user
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration(_) => {
                "Set exactly one of serialized_dashboard or file_path for each dashboard"
            }
            Self::ContentUnavailable { .. } => "Check that the file exists and is UTF-8 text",
            Self::Remote(e) => e.category().advice(),
            Self::InconsistentState { .. } => {
                "Inspect the dashboard in the workspace and trash it by hand before re-applying"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_inconsistent_state_keeps_both_errors() {
        let err = ControllerError::InconsistentState {
            dashboard_id: "d1".into(),
            publish_error: "warehouse stopped".into(),
            source: lakeview::Error::api(500, None, "trash unavailable"),
        };
        let text = err.to_string();
        assert!(text.contains("d1"));
        assert!(text.contains("warehouse stopped"));
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("trash unavailable")
        );
        assert_eq!(err.category(), Some(ErrorCategory::Transient));
    }

    #[test]
    fn test_remote_is_transparent() {
        let err = ControllerError::from(lakeview::Error::permission_denied("nope"));
        assert_eq!(err.to_string(), "nope");
        assert_eq!(err.category(), Some(ErrorCategory::PermissionDenied));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_configuration_has_no_category() {
        let err = ControllerError::Configuration("both set".into());
        assert!(err.category().is_none());
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
