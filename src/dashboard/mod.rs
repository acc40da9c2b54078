//! Dashboard lifecycle: content, change detection, remote operations and
//! the reconciliation resource built on top of them.

pub mod content;
pub mod controller;
pub mod drift;
pub mod error;
pub mod resource;
pub mod schema;

pub use content::{ContentResolver, ContentSpecification, ResolveContext};
pub use controller::{Created, Observation, Updated};
pub use error::ControllerError;
pub use resource::DashboardResource;

use chrono::{DateTime, Utc};
use lakeview::{CreateDashboard, Dashboard, LifecycleState, PublishRequest, UpdateDashboard};
use serde::{Deserialize, Serialize};

/// Resource type used in plan output and target filters
pub const RESOURCE_TYPE: &str = "dashboard";

/// Declared target state of one dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredDashboard {
    pub display_name: String,
    pub parent_path: String,
    pub warehouse_id: String,
    pub embed_credentials: bool,
    pub content: Option<ContentSpecification>,
}

impl DesiredDashboard {
    /// The attributes that are recorded after a successful apply
    pub fn attributes(&self) -> AppliedAttributes {
        AppliedAttributes {
            display_name: self.display_name.clone(),
            parent_path: self.parent_path.clone(),
            warehouse_id: self.warehouse_id.clone(),
            embed_credentials: self.embed_credentials,
        }
    }

    pub(crate) fn create_request(&self, content: String) -> CreateDashboard {
        CreateDashboard {
            display_name: self.display_name.clone(),
            parent_path: self.parent_path.clone(),
            warehouse_id: Some(self.warehouse_id.clone()),
            serialized_dashboard: Some(content),
        }
    }

    pub(crate) fn update_request(&self, content: Option<String>) -> UpdateDashboard {
        UpdateDashboard {
            display_name: self.display_name.clone(),
            warehouse_id: Some(self.warehouse_id.clone()),
            serialized_dashboard: content,
        }
    }

    /// Publish request with `embed_credentials` always on the wire
    pub(crate) fn publish_request(&self, dashboard_id: &str) -> PublishRequest {
        PublishRequest::new(dashboard_id)
            .warehouse_id(self.warehouse_id.as_str())
            .embed_credentials(self.embed_credentials)
            .force_send(lakeview::EMBED_CREDENTIALS)
    }
}

/// Attributes as last applied by this tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAttributes {
    pub display_name: String,
    pub parent_path: String,
    pub warehouse_id: String,
    pub embed_credentials: bool,
}

impl AppliedAttributes {
    /// Value of a schema attribute in display form
    pub fn value(&self, name: &str) -> Option<String> {
        match name {
            "display_name" => Some(self.display_name.clone()),
            "parent_path" => Some(self.parent_path.clone()),
            "warehouse_id" => Some(self.warehouse_id.clone()),
            "embed_credentials" => Some(self.embed_credentials.to_string()),
            _ => None,
        }
    }
}

/// What the last refresh saw on the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSeen {
    pub lifecycle_state: LifecycleState,
    pub etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Record of the last known-good remote state of one dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub dashboard_id: String,
    /// Etag written by the last create or update
    pub etag: String,
    /// Fingerprint of the content last pushed
    pub fingerprint: String,
    /// The remote etag differed from `etag` at the last refresh
    #[serde(default)]
    pub drift_observed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub applied: AppliedAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<LastSeen>,
}

impl PersistedState {
    pub fn new(
        dashboard_id: impl Into<String>,
        etag: impl Into<String>,
        fingerprint: impl Into<String>,
        applied: AppliedAttributes,
    ) -> Self {
        Self {
            dashboard_id: dashboard_id.into(),
            etag: etag.into(),
            fingerprint: fingerprint.into(),
            drift_observed: false,
            path: None,
            updated_at: Utc::now(),
            applied,
            last_seen: None,
        }
    }

    /// State after a successful create
    pub fn from_created(created: Created, applied: AppliedAttributes) -> Self {
        let mut state = Self::new(created.dashboard_id, created.etag, created.fingerprint, applied);
        state.path = created.path;
        state
    }

    /// Record a successful update; clears drift
    pub fn record_update(&mut self, updated: Updated, applied: AppliedAttributes) {
        self.etag = updated.etag;
        self.fingerprint = updated.fingerprint;
        self.drift_observed = false;
        self.applied = applied;
        self.updated_at = Utc::now();
    }

    /// Record a refresh. The recorded etag is kept, so drift stays visible
    /// until the next create or update.
    pub fn record_read(&mut self, dashboard: &Dashboard, drift: bool) {
        self.drift_observed = drift;
        if dashboard.path.is_some() {
            self.path = dashboard.path.clone();
        }
        self.last_seen = Some(LastSeen {
            lifecycle_state: dashboard.lifecycle_state,
            etag: dashboard.etag.clone(),
            update_time: dashboard.update_time.clone(),
            checked_at: Utc::now(),
        });
    }
}

/// Compare parent paths the way the workspace does: `/Workspace/Shared`
/// and `/Shared` name the same folder.
pub fn normalize_parent_path(path: &str) -> String {
    let path = match path.strip_prefix("/Workspace") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desired() -> DesiredDashboard {
        DesiredDashboard {
            display_name: "Sales".into(),
            parent_path: "/Shared/reports".into(),
            warehouse_id: "wh".into(),
            embed_credentials: false,
            content: None,
        }
    }

    #[test]
    fn test_normalize_parent_path() {
        assert_eq!(normalize_parent_path("/Workspace/Shared"), "/Shared");
        assert_eq!(normalize_parent_path("/Shared/"), "/Shared");
        assert_eq!(normalize_parent_path("/Workspace"), "/");
        assert_eq!(normalize_parent_path("/WorkspaceX/a"), "/WorkspaceX/a");
    }

    #[test]
    fn test_publish_request_force_sends_false() {
        let request = desired().publish_request("d1");
        assert!(!request.embed_credentials);
        assert!(request.is_force_sent(lakeview::EMBED_CREDENTIALS));
        assert_eq!(request.body()[lakeview::EMBED_CREDENTIALS], false);
    }

    #[test]
    fn test_record_read_keeps_recorded_etag() {
        let mut state = PersistedState::new("d1", "1", "fp", desired().attributes());
        let observed = Dashboard {
            dashboard_id: "d1".into(),
            etag: "7".into(),
            path: Some("/Shared/reports/Sales.lvdash.json".into()),
            ..Default::default()
        };
        state.record_read(&observed, true);
        assert_eq!(state.etag, "1");
        assert!(state.drift_observed);
        assert_eq!(state.last_seen.as_ref().map(|s| s.etag.as_str()), Some("7"));
        assert!(state.path.is_some());
    }

    #[test]
    fn test_applied_value_covers_recorded_attributes() {
        let applied = desired().attributes();
        assert_eq!(applied.value("parent_path").as_deref(), Some("/Shared/reports"));
        assert_eq!(applied.value("embed_credentials").as_deref(), Some("false"));
        assert_eq!(applied.value("file_path"), None);
    }

    #[test]
    fn test_record_update_clears_drift() {
        let mut state = PersistedState::new("d1", "1", "fp", desired().attributes());
        state.drift_observed = true;
        state.record_update(
            Updated {
                etag: "9".into(),
                fingerprint: "fp2".into(),
            },
            desired().attributes(),
        );
        assert_eq!(state.etag, "9");
        assert_eq!(state.fingerprint, "fp2");
        assert!(!state.drift_observed);
    }
}
