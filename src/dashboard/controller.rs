//! Lifecycle controller
//!
//! Drives one dashboard through create, read, update and delete against a
//! [`Backend`]. The service has no transactions, so multi-step operations
//! are made to look atomic:
//!
//! - create and update publish right away; if publishing fails the
//!   dashboard is trashed so no unpublished draft is reported as success
//! - a missing parent folder is created once and the create retried once
//! - deleting an already trashed dashboard succeeds
//!
//! The controller never skips a remote call on its own. Whether an update
//! is needed at all is decided by the caller with [`should_push`].
//!
//! [`should_push`]: super::drift::should_push

use super::content::{ContentResolver, ResolveContext};
use super::drift::detect_drift;
use super::error::{ControllerError, Result};
use super::{DesiredDashboard, PersistedState};
use lakeview::{Backend, CreateDashboard, Dashboard};

/// Outcome of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub dashboard_id: String,
    pub etag: String,
    pub fingerprint: String,
    pub path: Option<String>,
}

/// Outcome of a successful update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub etag: String,
    pub fingerprint: String,
}

/// Outcome of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Trashed or gone; the next apply recreates it
    Absent,
    /// Live dashboard and whether it changed behind our back
    Present { dashboard: Dashboard, drift: bool },
}

/// Runs lifecycle operations for dashboards
pub struct LifecycleController<'a> {
    backend: &'a dyn Backend,
    resolver: &'a ContentResolver,
}

impl<'a> LifecycleController<'a> {
    pub fn new(backend: &'a dyn Backend, resolver: &'a ContentResolver) -> Self {
        Self { backend, resolver }
    }

    /// Create and publish a dashboard
    pub fn create(&self, desired: &DesiredDashboard) -> Result<Created> {
        let resolved = self
            .resolver
            .resolve(desired.content.as_ref(), ResolveContext::Create)?
            .ok_or_else(|| {
                ControllerError::Configuration("dashboard content is required".to_string())
            })?;

        let request = desired.create_request(resolved.content);
        let created = self.create_with_parent(&request)?;
        log::info!(
            "Created dashboard {} ({})",
            created.dashboard_id,
            desired.display_name
        );

        self.publish_or_rollback(&created.dashboard_id, desired)?;

        Ok(Created {
            dashboard_id: created.dashboard_id,
            etag: created.etag,
            fingerprint: resolved.fingerprint,
            path: created.path,
        })
    }

    /// Fetch the remote dashboard and compare it with the recorded state
    pub fn read(&self, persisted: &PersistedState) -> Result<Observation> {
        let dashboard = match self.backend.get(&persisted.dashboard_id) {
            Ok(dashboard) => dashboard,
            Err(e) if e.is_not_found() => {
                log::info!("Dashboard {} no longer exists", persisted.dashboard_id);
                return Ok(Observation::Absent);
            }
            Err(e) => return Err(e.into()),
        };

        if dashboard.is_trashed() {
            log::info!("Dashboard {} is in the trash", persisted.dashboard_id);
            return Ok(Observation::Absent);
        }

        let drift = detect_drift(persisted, &dashboard);
        if drift {
            log::warn!(
                "Dashboard {} was modified outside dashctl (etag {} -> {})",
                persisted.dashboard_id,
                persisted.etag,
                dashboard.etag
            );
        }
        Ok(Observation::Present { dashboard, drift })
    }

    /// Update and republish a dashboard
    ///
    /// Always sends the update. Without a content source the remote
    /// definition is left as is and the recorded fingerprint carried over.
    pub fn update(&self, persisted: &PersistedState, desired: &DesiredDashboard) -> Result<Updated> {
        let resolved = self
            .resolver
            .resolve(desired.content.as_ref(), ResolveContext::Update)?;
        let (content, fingerprint) = match resolved {
            Some(r) => (Some(r.content), r.fingerprint),
            None => (None, persisted.fingerprint.clone()),
        };

        let dashboard_id = persisted.dashboard_id.as_str();
        let updated = self
            .backend
            .update(dashboard_id, &desired.update_request(content))?;
        log::info!("Updated dashboard {dashboard_id}");

        self.publish_or_rollback(dashboard_id, desired)?;

        Ok(Updated {
            etag: updated.etag,
            fingerprint,
        })
    }

    /// Trash a dashboard; already trashed counts as success
    pub fn delete(&self, dashboard_id: &str) -> Result<()> {
        let trash_error = match self.backend.trash(dashboard_id) {
            Ok(()) => {
                log::info!("Trashed dashboard {dashboard_id}");
                return Ok(());
            }
            Err(e) => e,
        };

        if !trash_error.is_permission_denied() {
            return Err(trash_error.into());
        }

        // Re-trashing is refused with permission denied, so look before
        // deciding which one this is.
        match self.backend.get(dashboard_id) {
            Ok(dashboard) if dashboard.is_trashed() => {
                log::debug!("Dashboard {dashboard_id} was already trashed");
                Ok(())
            }
            Ok(_) => Err(trash_error.into()),
            Err(lookup) => {
                log::debug!("Could not look up dashboard {dashboard_id}: {lookup}");
                Err(trash_error.into())
            }
        }
    }

    fn create_with_parent(&self, request: &CreateDashboard) -> Result<Dashboard> {
        match self.backend.create(request) {
            Err(e) if e.is_parent_missing() => {
                log::debug!(
                    "Parent folder '{}' doesn't exist, creating it",
                    request.parent_path
                );
                self.backend.mkdirs(&request.parent_path)?;
                Ok(self.backend.create(request)?)
            }
            result => Ok(result?),
        }
    }

    fn publish_or_rollback(&self, dashboard_id: &str, desired: &DesiredDashboard) -> Result<()> {
        let publish_error = match self.backend.publish(&desired.publish_request(dashboard_id)) {
            Ok(()) => {
                log::debug!("Published dashboard {dashboard_id}");
                return Ok(());
            }
            Err(e) => e,
        };

        log::warn!("Publishing dashboard {dashboard_id} failed, trashing it: {publish_error}");
        match self.backend.trash(dashboard_id) {
            Ok(()) => Err(publish_error.into()),
            Err(trash_error) => Err(ControllerError::InconsistentState {
                dashboard_id: dashboard_id.to_string(),
                publish_error: publish_error.to_string(),
                source: trash_error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::ContentSpecification;
    use lakeview::{Call, Error, ErrorCategory, LifecycleState, MockBackend, Operation};

    const CONTENT: &str = r#"{"pages":[{"name":"overview"}]}"#;

    fn desired() -> DesiredDashboard {
        DesiredDashboard {
            display_name: "Sales".into(),
            parent_path: "/Shared/reports".into(),
            warehouse_id: "wh-1".into(),
            embed_credentials: false,
            content: Some(ContentSpecification::Inline(CONTENT.into())),
        }
    }

    fn resolver() -> ContentResolver {
        ContentResolver::new(".")
    }

    fn created(mock: &MockBackend) -> (Created, PersistedState) {
        let resolver = resolver();
        let controller = LifecycleController::new(mock, &resolver);
        let created = controller.create(&desired()).unwrap();
        let state = PersistedState::from_created(created.clone(), desired().attributes());
        (created, state)
    }

    // Delete

    #[test]
    fn test_delete_trashes_active_dashboard() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, _) = created(&mock);
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        controller.delete(&created.dashboard_id).unwrap();
        assert!(mock.dashboard(&created.dashboard_id).unwrap().is_trashed());
    }

    #[test]
    fn test_delete_is_idempotent_for_trashed() {
        let mock = MockBackend::new();
        mock.insert(Dashboard {
            dashboard_id: "d1".into(),
            etag: "1".into(),
            lifecycle_state: LifecycleState::Trashed,
            ..Default::default()
        });
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        controller.delete("d1").unwrap();
        controller.delete("d1").unwrap();
        assert_eq!(mock.count(Operation::Trash), 2);
        assert_eq!(mock.count(Operation::Get), 2);
    }

    #[test]
    fn test_delete_real_permission_error_is_surfaced() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, _) = created(&mock);
        mock.fail_next(
            Operation::Trash,
            Error::permission_denied("User lacks CAN_MANAGE"),
        );
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.delete(&created.dashboard_id).unwrap_err();
        assert_eq!(err.to_string(), "User lacks CAN_MANAGE");
        assert_eq!(err.category(), Some(ErrorCategory::PermissionDenied));
    }

    #[test]
    fn test_delete_lookup_failure_returns_trash_error() {
        let mock = MockBackend::new();
        mock.fail_next(Operation::Trash, Error::permission_denied("trash refused"));
        mock.fail_next(Operation::Get, Error::api(503, None, "get unavailable"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.delete("d1").unwrap_err();
        assert_eq!(err.to_string(), "trash refused");
    }

    #[test]
    fn test_delete_other_errors_skip_lookup() {
        let mock = MockBackend::new();
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.delete("missing").unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::NotFound));
        assert_eq!(mock.count(Operation::Get), 0);
    }

    // Create

    #[test]
    fn test_create_publishes_with_forced_embed_credentials() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, _) = created(&mock);

        let publish = mock.last_publish(&created.dashboard_id).unwrap();
        assert!(!publish.embed_credentials);
        assert!(publish.is_force_sent(lakeview::EMBED_CREDENTIALS));
        assert_eq!(publish.warehouse_id.as_deref(), Some("wh-1"));
        assert_eq!(created.fingerprint, crate::dashboard::content::fingerprint(CONTENT.as_bytes()));
        assert_eq!(created.etag, mock.dashboard(&created.dashboard_id).unwrap().etag);
    }

    #[test]
    fn test_create_rolls_back_when_publish_fails() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        mock.fail_next(Operation::Publish, Error::api(400, Some("INVALID_PARAMETER_VALUE"), "bad warehouse"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.create(&desired()).unwrap_err();
        assert_eq!(err.to_string(), "bad warehouse");

        let attempted = mock
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::Trash(id) => Some(id),
                _ => None,
            })
            .unwrap();
        let remote = mock.get(&attempted).unwrap();
        assert_ne!(remote.lifecycle_state, LifecycleState::Active);
    }

    #[test]
    fn test_create_double_failure_is_inconsistent_state() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        mock.fail_next(Operation::Publish, Error::api(500, None, "publish broke"));
        mock.fail_next(Operation::Trash, Error::api(500, None, "trash broke"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.create(&desired()).unwrap_err();
        match err {
            ControllerError::InconsistentState {
                dashboard_id,
                publish_error,
                source,
            } => {
                assert_eq!(dashboard_id, "mock-0001");
                assert_eq!(publish_error, "publish broke");
                assert_eq!(source.to_string(), "trash broke");
            }
            other => panic!("expected InconsistentState, got {other:?}"),
        }
    }

    #[test]
    fn test_create_makes_missing_parent_once() {
        let mock = MockBackend::new();
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        controller.create(&desired()).unwrap();
        assert_eq!(mock.count(Operation::Mkdirs), 1);
        assert_eq!(mock.count(Operation::Create), 2);
        assert!(mock.has_directory("/Shared/reports"));
        assert_eq!(
            mock.calls()
                .iter()
                .map(Call::operation)
                .take(3)
                .collect::<Vec<_>>(),
            vec![Operation::Create, Operation::Mkdirs, Operation::Create]
        );
    }

    #[test]
    fn test_create_retry_failure_is_fatal() {
        let mock = MockBackend::new();
        mock.fail_next(Operation::Create, Error::parent_missing("/Shared/reports"));
        mock.fail_next(Operation::Create, Error::parent_missing("/Shared/reports"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.create(&desired()).unwrap_err();
        assert!(matches!(&err, ControllerError::Remote(e) if e.is_parent_missing()));
        assert_eq!(mock.count(Operation::Mkdirs), 1);
        assert_eq!(mock.count(Operation::Create), 2);
        assert_eq!(mock.count(Operation::Publish), 0);
    }

    #[test]
    fn test_create_mkdirs_failure_is_fatal() {
        let mock = MockBackend::new();
        mock.fail_next(Operation::Create, Error::parent_missing("/Shared/reports"));
        mock.fail_next(Operation::Mkdirs, Error::permission_denied("no mkdirs"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.create(&desired()).unwrap_err();
        assert_eq!(err.to_string(), "no mkdirs");
        assert_eq!(mock.count(Operation::Create), 1);
        assert_eq!(mock.count(Operation::Mkdirs), 1);
        assert_eq!(mock.count(Operation::Publish), 0);
        assert!(!mock.has_directory("/Shared/reports"));
    }

    #[test]
    fn test_create_other_errors_do_not_mkdirs() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        mock.fail_next(Operation::Create, Error::permission_denied("no access to folder"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        assert!(controller.create(&desired()).is_err());
        assert_eq!(mock.count(Operation::Mkdirs), 0);
        assert_eq!(mock.count(Operation::Create), 1);
    }

    #[test]
    fn test_create_without_content_makes_no_calls() {
        let mock = MockBackend::new();
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);
        let mut desired = desired();
        desired.content = None;

        let err = controller.create(&desired).unwrap_err();
        assert!(matches!(err, ControllerError::Configuration(_)));
        assert!(mock.calls().is_empty());
    }

    // Read

    #[test]
    fn test_read_reports_trashed_as_absent() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, state) = created(&mock);
        mock.trash(&created.dashboard_id).unwrap();
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        assert_eq!(controller.read(&state).unwrap(), Observation::Absent);
    }

    #[test]
    fn test_read_missing_is_absent() {
        let mock = MockBackend::new();
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);
        let state = PersistedState::new("gone", "1", "fp", desired().attributes());

        assert_eq!(controller.read(&state).unwrap(), Observation::Absent);
    }

    #[test]
    fn test_read_detects_out_of_band_edit() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, state) = created(&mock);
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        match controller.read(&state).unwrap() {
            Observation::Present { drift, .. } => assert!(!drift),
            Observation::Absent => panic!("expected present"),
        }

        mock.edit_out_of_band(&created.dashboard_id, "{}").unwrap();
        match controller.read(&state).unwrap() {
            Observation::Present { drift, dashboard } => {
                assert!(drift);
                assert_ne!(dashboard.etag, state.etag);
            }
            Observation::Absent => panic!("expected present"),
        }
    }

    #[test]
    fn test_read_surfaces_transient_errors() {
        let mock = MockBackend::new();
        mock.fail_next(Operation::Get, Error::api(503, Some("TEMPORARILY_UNAVAILABLE"), "later"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);
        let state = PersistedState::new("d1", "1", "fp", desired().attributes());

        let err = controller.read(&state).unwrap_err();
        assert!(err.is_retryable());
    }

    // Update

    #[test]
    fn test_update_returns_new_etag_and_fingerprint() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, state) = created(&mock);
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let mut desired = desired();
        desired.content = Some(ContentSpecification::Inline("{\"pages\":[]}".into()));
        desired.embed_credentials = true;
        let updated = controller.update(&state, &desired).unwrap();

        assert_ne!(updated.etag, created.etag);
        assert_ne!(updated.fingerprint, created.fingerprint);
        let publish = mock.last_publish(&created.dashboard_id).unwrap();
        assert!(publish.embed_credentials);
        assert!(publish.is_force_sent(lakeview::EMBED_CREDENTIALS));
    }

    #[test]
    fn test_update_is_sent_even_when_unchanged() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (_, state) = created(&mock);
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let updated = controller.update(&state, &desired()).unwrap();
        assert_eq!(updated.fingerprint, state.fingerprint);
        assert_eq!(mock.count(Operation::Update), 1);
    }

    #[test]
    fn test_update_without_content_keeps_remote_definition() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, state) = created(&mock);
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let mut desired = desired();
        desired.content = None;
        desired.display_name = "Sales v2".into();
        let updated = controller.update(&state, &desired).unwrap();

        assert_eq!(updated.fingerprint, state.fingerprint);
        let remote = mock.dashboard(&created.dashboard_id).unwrap();
        assert_eq!(remote.serialized_dashboard.as_deref(), Some(CONTENT));
        assert_eq!(remote.display_name, "Sales v2");
    }

    #[test]
    fn test_update_rolls_back_when_publish_fails() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (created, state) = created(&mock);
        mock.fail_next(Operation::Publish, Error::api(500, None, "publish broke"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.update(&state, &desired()).unwrap_err();
        assert!(matches!(err, ControllerError::Remote(_)));
        assert!(mock.dashboard(&created.dashboard_id).unwrap().is_trashed());
    }

    #[test]
    fn test_update_double_failure_is_inconsistent_state() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (_, state) = created(&mock);
        mock.fail_next(Operation::Publish, Error::api(500, None, "publish broke"));
        mock.fail_next(Operation::Trash, Error::permission_denied("trash refused"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);

        let err = controller.update(&state, &desired()).unwrap_err();
        assert!(matches!(err, ControllerError::InconsistentState { .. }));
    }

    #[test]
    fn test_update_error_is_surfaced_without_publish() {
        let mock = MockBackend::new().with_directory("/Shared/reports");
        let (_, state) = created(&mock);
        mock.fail_next(Operation::Update, Error::api(400, Some("INVALID_PARAMETER_VALUE"), "bad json"));
        let resolver = resolver();
        let controller = LifecycleController::new(&mock, &resolver);
        let publishes_before = mock.count(Operation::Publish);

        let err = controller.update(&state, &desired()).unwrap_err();
        assert_eq!(err.to_string(), "bad json");
        assert_eq!(mock.count(Operation::Publish), publishes_before);
        assert_eq!(mock.count(Operation::Trash), 0);
    }
}
