//! Backend trait and implementations for talking to the dashboards service.
//!
//! [`http::HttpBackend`] is the real client. [`MockBackend`] keeps
//! dashboards in memory, mimics the service's trash and parent-folder
//! behaviour, records every call and can be told to fail specific calls.
//!
//! # Testing
//!
//! ```
//! use lakeview::backend::{Backend, MockBackend, Operation};
//! use lakeview::{CreateDashboard, Error};
//!
//! let mock = MockBackend::new().with_directory("/Shared");
//! mock.fail_next(Operation::Publish, Error::api(500, None, "boom"));
//!
//! let created = mock
//!     .create(&CreateDashboard {
//!         display_name: "Sales".to_string(),
//!         parent_path: "/Shared".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//! assert_eq!(created.etag, "1");
//! assert_eq!(mock.count(Operation::Create), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{CreateDashboard, Dashboard, LifecycleState, PublishRequest, UpdateDashboard};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations offered by the dashboards service.
///
/// Implementations perform exactly one remote call per method. They do not
/// retry mutating calls.
pub trait Backend: Send + Sync {
    /// Create a draft dashboard.
    ///
    /// # Errors
    ///
    /// Fails with a not-found error shaped like `Path (<parent>) doesn't
    /// exist.` when the parent folder is missing.
    fn create(&self, request: &CreateDashboard) -> Result<Dashboard>;

    /// Fetch a dashboard, including trashed ones.
    fn get(&self, dashboard_id: &str) -> Result<Dashboard>;

    /// Update a draft dashboard in place.
    fn update(&self, dashboard_id: &str, request: &UpdateDashboard) -> Result<Dashboard>;

    /// Publish the current draft.
    fn publish(&self, request: &PublishRequest) -> Result<()>;

    /// Move a dashboard to the trash.
    ///
    /// # Errors
    ///
    /// The service answers permission-denied when the dashboard is already
    /// trashed.
    fn trash(&self, dashboard_id: &str) -> Result<()>;

    /// Create a workspace folder and all missing ancestors.
    fn mkdirs(&self, path: &str) -> Result<()>;
}

/// Identifies a backend method, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Backend::create`]
    Create,
    /// [`Backend::get`]
    Get,
    /// [`Backend::update`]
    Update,
    /// [`Backend::publish`]
    Publish,
    /// [`Backend::trash`]
    Trash,
    /// [`Backend::mkdirs`]
    Mkdirs,
}

/// A recorded call against the [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Create with its request body.
    Create(CreateDashboard),
    /// Get by dashboard id.
    Get(String),
    /// Update by dashboard id with its request body.
    Update(String, UpdateDashboard),
    /// Publish request.
    Publish(PublishRequest),
    /// Trash by dashboard id.
    Trash(String),
    /// Folder path passed to mkdirs.
    Mkdirs(String),
}

impl Call {
    /// The operation this call invoked.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Get(_) => Operation::Get,
            Self::Update(..) => Operation::Update,
            Self::Publish(_) => Operation::Publish,
            Self::Trash(_) => Operation::Trash,
            Self::Mkdirs(_) => Operation::Mkdirs,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    dashboards: HashMap<String, Dashboard>,
    directories: HashSet<String>,
    published: HashMap<String, PublishRequest>,
    failures: HashMap<Operation, VecDeque<Error>>,
    calls: Vec<Call>,
    next_id: u64,
    next_etag: u64,
}

impl MockState {
    /// Record a call and pop an injected failure for it, if any.
    fn enter(&mut self, call: Call) -> Result<()> {
        let operation = call.operation();
        self.calls.push(call);
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn bump_etag(&mut self) -> String {
        self.next_etag += 1;
        self.next_etag.to_string()
    }

    fn add_directory(&mut self, path: &str) {
        let mut current = normalize_dir(path);
        loop {
            self.directories.insert(current.clone());
            match current.rfind('/') {
                Some(0) | None => break,
                Some(idx) => current.truncate(idx),
            }
        }
        self.directories.insert("/".to_string());
    }

    fn active_mut(&mut self, dashboard_id: &str) -> Result<&mut Dashboard> {
        let dashboard = self
            .dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| Error::not_found(format!("Dashboard {dashboard_id} does not exist.")))?;
        if dashboard.is_trashed() {
            return Err(Error::api(
                400,
                Some("INVALID_STATE"),
                format!("Dashboard {dashboard_id} is in the trash."),
            ));
        }
        Ok(dashboard)
    }
}

fn normalize_dir(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// In-memory backend for tests.
///
/// Clones share the same state, so a test can keep a handle while the code
/// under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create an empty backend with only the root folder.
    #[must_use]
    pub fn new() -> Self {
        let mock = Self::default();
        mock.lock().add_directory("/");
        mock
    }

    /// Add an existing folder (and its ancestors).
    #[must_use]
    pub fn with_directory(self, path: &str) -> Self {
        self.lock().add_directory(path);
        self
    }

    /// Whether a folder exists.
    #[must_use]
    pub fn has_directory(&self, path: &str) -> bool {
        self.lock().directories.contains(&normalize_dir(path))
    }

    /// Store a dashboard directly, bypassing create.
    pub fn insert(&self, dashboard: Dashboard) {
        let mut state = self.lock();
        state
            .dashboards
            .insert(dashboard.dashboard_id.clone(), dashboard);
    }

    /// Current server-side copy of a dashboard.
    #[must_use]
    pub fn dashboard(&self, dashboard_id: &str) -> Option<Dashboard> {
        self.lock().dashboards.get(dashboard_id).cloned()
    }

    /// Last publish request received for a dashboard.
    #[must_use]
    pub fn last_publish(&self, dashboard_id: &str) -> Option<PublishRequest> {
        self.lock().published.get(dashboard_id).cloned()
    }

    /// Simulate somebody editing the dashboard in the UI.
    ///
    /// Returns the new etag.
    pub fn edit_out_of_band(&self, dashboard_id: &str, content: &str) -> Option<String> {
        let mut state = self.lock();
        let etag = state.bump_etag();
        let dashboard = state.dashboards.get_mut(dashboard_id)?;
        dashboard.serialized_dashboard = Some(content.to_string());
        dashboard.etag = etag.clone();
        Some(etag)
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// Several failures for the same operation are returned in order.
    pub fn fail_next(&self, operation: Operation, error: Error) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// All calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls of one operation received so far.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for MockBackend {
    fn create(&self, request: &CreateDashboard) -> Result<Dashboard> {
        let mut state = self.lock();
        state.enter(Call::Create(request.clone()))?;

        let parent = normalize_dir(&request.parent_path);
        if !state.directories.contains(&parent) {
            return Err(Error::parent_missing(&request.parent_path));
        }

        state.next_id += 1;
        let dashboard_id = format!("mock-{:04}", state.next_id);
        let etag = state.bump_etag();
        let dashboard = Dashboard {
            dashboard_id: dashboard_id.clone(),
            display_name: request.display_name.clone(),
            parent_path: Some(request.parent_path.clone()),
            path: Some(format!(
                "{}/{}.lvdash.json",
                parent.trim_end_matches('/'),
                request.display_name
            )),
            warehouse_id: request.warehouse_id.clone(),
            etag,
            lifecycle_state: LifecycleState::Active,
            serialized_dashboard: request.serialized_dashboard.clone(),
            create_time: None,
            update_time: None,
        };
        state.dashboards.insert(dashboard_id, dashboard.clone());
        Ok(dashboard)
    }

    fn get(&self, dashboard_id: &str) -> Result<Dashboard> {
        let mut state = self.lock();
        state.enter(Call::Get(dashboard_id.to_string()))?;
        state
            .dashboards
            .get(dashboard_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Dashboard {dashboard_id} does not exist.")))
    }

    fn update(&self, dashboard_id: &str, request: &UpdateDashboard) -> Result<Dashboard> {
        let mut state = self.lock();
        state.enter(Call::Update(dashboard_id.to_string(), request.clone()))?;
        let etag = state.bump_etag();

        let dashboard = state.active_mut(dashboard_id)?;
        dashboard.display_name = request.display_name.clone();
        if request.warehouse_id.is_some() {
            dashboard.warehouse_id = request.warehouse_id.clone();
        }
        if request.serialized_dashboard.is_some() {
            dashboard.serialized_dashboard = request.serialized_dashboard.clone();
        }
        dashboard.etag = etag;
        Ok(dashboard.clone())
    }

    fn publish(&self, request: &PublishRequest) -> Result<()> {
        let mut state = self.lock();
        state.enter(Call::Publish(request.clone()))?;
        state.active_mut(&request.dashboard_id)?;
        state
            .published
            .insert(request.dashboard_id.clone(), request.clone());
        Ok(())
    }

    fn trash(&self, dashboard_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter(Call::Trash(dashboard_id.to_string()))?;
        let etag = state.bump_etag();

        let dashboard = state
            .dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| Error::not_found(format!("Dashboard {dashboard_id} does not exist.")))?;
        if dashboard.is_trashed() {
            return Err(Error::permission_denied(format!(
                "User does not have permission to trash dashboard {dashboard_id}."
            )));
        }
        dashboard.lifecycle_state = LifecycleState::Trashed;
        dashboard.etag = etag;
        state.published.remove(dashboard_id);
        Ok(())
    }

    fn mkdirs(&self, path: &str) -> Result<()> {
        let mut state = self.lock();
        state.enter(Call::Mkdirs(path.to_string()))?;
        state.add_directory(path);
        Ok(())
    }
}
