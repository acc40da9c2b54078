//! Wire types for the Lakeview dashboards API.
//!
//! Request types follow the service's omit-empty convention: unset optional
//! fields and zero-valued booleans are left out of the JSON body. A zero
//! value is only sent when its field name is listed in
//! [`PublishRequest::force_send_fields`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Wire name of the publish flag that embeds the publisher's credentials.
pub const EMBED_CREDENTIALS: &str = "embed_credentials";

/// Lifecycle state of a dashboard as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Live dashboard.
    #[default]
    Active,
    /// Soft-deleted. The id still resolves, but the dashboard cannot be
    /// updated until it is restored.
    Trashed,
    /// A state this client does not know about.
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    /// Lowercase name for display.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trashed => "trashed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A dashboard as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Service-assigned id.
    #[serde(default)]
    pub dashboard_id: String,
    /// Title shown in the workspace.
    #[serde(default)]
    pub display_name: String,
    /// Folder holding the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    /// Full workspace path of the dashboard object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Warehouse used to run the dashboard's queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    /// Opaque version tag; changes on every modification by any actor.
    #[serde(default)]
    pub etag: String,
    /// Active or trashed.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Dashboard definition (JSON text). Only present on some responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized_dashboard: Option<String>,
    /// RFC 3339 creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// RFC 3339 last-update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Dashboard {
    /// Whether the dashboard sits in the trash.
    #[must_use]
    pub fn is_trashed(&self) -> bool {
        self.lifecycle_state == LifecycleState::Trashed
    }
}

/// Body of a create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateDashboard {
    /// Title shown in the workspace.
    pub display_name: String,
    /// Folder to create the dashboard in. Must already exist.
    pub parent_path: String,
    /// Warehouse for the draft.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    /// Dashboard definition (JSON text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialized_dashboard: Option<String>,
}

/// Body of an update call.
///
/// The parent path is immutable on the service side and therefore absent.
/// Leaving `serialized_dashboard` unset keeps the remote definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateDashboard {
    /// Title shown in the workspace.
    pub display_name: String,
    /// Warehouse for the draft.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    /// Dashboard definition (JSON text).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialized_dashboard: Option<String>,
}

/// Publish call for a dashboard.
///
/// # Example
///
/// ```
/// use lakeview::{PublishRequest, EMBED_CREDENTIALS};
///
/// let request = PublishRequest::new("01ef")
///     .warehouse_id("abc123")
///     .embed_credentials(false)
///     .force_send(EMBED_CREDENTIALS);
///
/// assert_eq!(request.body()["embed_credentials"], false);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishRequest {
    /// Dashboard to publish.
    pub dashboard_id: String,
    /// Warehouse for the published dashboard.
    pub warehouse_id: Option<String>,
    /// Whether viewers run queries with the publisher's credentials.
    pub embed_credentials: bool,
    /// Field names sent even when they hold their zero value.
    pub force_send_fields: Vec<String>,
}

impl PublishRequest {
    /// Create a publish request for a dashboard.
    #[must_use]
    pub fn new(dashboard_id: impl Into<String>) -> Self {
        Self {
            dashboard_id: dashboard_id.into(),
            ..Self::default()
        }
    }

    /// Set the warehouse.
    #[must_use]
    pub fn warehouse_id(mut self, warehouse_id: impl Into<String>) -> Self {
        self.warehouse_id = Some(warehouse_id.into());
        self
    }

    /// Set the embed-credentials flag.
    #[must_use]
    pub fn embed_credentials(mut self, embed: bool) -> Self {
        self.embed_credentials = embed;
        self
    }

    /// Always send `field`, even when it holds its zero value.
    #[must_use]
    pub fn force_send(mut self, field: &str) -> Self {
        if !self.is_force_sent(field) {
            self.force_send_fields.push(field.to_string());
        }
        self
    }

    /// Whether `field` is force-sent.
    #[must_use]
    pub fn is_force_sent(&self, field: &str) -> bool {
        self.force_send_fields.iter().any(|f| f == field)
    }

    /// JSON body as it goes on the wire.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        if let Some(warehouse_id) = self.warehouse_id.as_deref().filter(|w| !w.is_empty()) {
            body.insert("warehouse_id".to_string(), Value::from(warehouse_id));
        }
        if self.embed_credentials || self.is_force_sent(EMBED_CREDENTIALS) {
            body.insert(
                EMBED_CREDENTIALS.to_string(),
                Value::from(self.embed_credentials),
            );
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_state_wire_names() {
        let active: LifecycleState = serde_json::from_str("\"ACTIVE\"").unwrap();
        let trashed: LifecycleState = serde_json::from_str("\"TRASHED\"").unwrap();
        let other: LifecycleState = serde_json::from_str("\"ARCHIVED\"").unwrap();
        assert_eq!(active, LifecycleState::Active);
        assert_eq!(trashed, LifecycleState::Trashed);
        assert_eq!(other, LifecycleState::Unknown);
    }

    #[test]
    fn test_dashboard_deserialize_minimal() {
        let json = r#"{"dashboard_id":"01ef","etag":"42","lifecycle_state":"TRASHED"}"#;
        let dashboard: Dashboard = serde_json::from_str(json).unwrap();
        assert_eq!(dashboard.dashboard_id, "01ef");
        assert_eq!(dashboard.etag, "42");
        assert!(dashboard.is_trashed());
        assert!(dashboard.serialized_dashboard.is_none());
    }

    #[test]
    fn test_update_omits_unset_content() {
        let update = UpdateDashboard {
            display_name: "Sales".to_string(),
            warehouse_id: Some("wh".to_string()),
            serialized_dashboard: None,
        };
        let body = serde_json::to_value(&update).unwrap();
        assert!(body.get("serialized_dashboard").is_none());
        assert_eq!(body["display_name"], "Sales");
    }

    #[test]
    fn test_publish_false_is_omitted_without_force_send() {
        let request = PublishRequest::new("01ef").embed_credentials(false);
        assert!(request.body().get(EMBED_CREDENTIALS).is_none());
    }

    #[test]
    fn test_publish_false_is_sent_when_forced() {
        let request = PublishRequest::new("01ef")
            .embed_credentials(false)
            .force_send(EMBED_CREDENTIALS);
        assert_eq!(request.body()[EMBED_CREDENTIALS], Value::Bool(false));
    }

    #[test]
    fn test_publish_true_is_always_sent() {
        let request = PublishRequest::new("01ef")
            .warehouse_id("wh")
            .embed_credentials(true);
        let body = request.body();
        assert_eq!(body[EMBED_CREDENTIALS], Value::Bool(true));
        assert_eq!(body["warehouse_id"], "wh");
    }

    #[test]
    fn test_force_send_is_deduplicated() {
        let request = PublishRequest::new("01ef")
            .force_send(EMBED_CREDENTIALS)
            .force_send(EMBED_CREDENTIALS);
        assert_eq!(request.force_send_fields.len(), 1);
    }
}
