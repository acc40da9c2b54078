//! Command implementations
//!
//! - `validate` - Check the project file offline
//! - `lifecycle` - refresh, plan, apply and destroy
//! - `inspect` - status, show and diff

pub mod inspect;
pub mod lifecycle;
pub mod validate;

use anyhow::{Context as AnyhowContext, Result};
use lakeview::backend::http::HttpBackend;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::config::ProjectConfig;
use crate::dashboard::resource::Session;
use crate::dashboard::schema::{ResourceSchema, dashboard_schema};
use crate::dashboard::{ContentResolver, DesiredDashboard};
use crate::paths;
use crate::state::StateStore;

/// Project file, state location and schema for one invocation
pub struct Project {
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub config: ProjectConfig,
    pub schema: ResourceSchema,
}

impl Project {
    /// Locate and parse the project file
    pub fn load(ctx: &Context) -> Result<Self> {
        let config_path = paths::config_file(ctx.config.as_deref());
        let state_path = paths::state_file(ctx.state.as_deref(), &config_path);
        log::debug!(
            "Project file {}, state file {}",
            config_path.display(),
            state_path.display()
        );

        let config = ProjectConfig::load(&config_path)?;
        Ok(Self {
            config_path,
            state_path,
            config,
            schema: dashboard_schema(),
        })
    }

    /// Declared dashboards; fails on any validation problem
    pub fn desired(&self) -> Result<BTreeMap<String, DesiredDashboard>> {
        self.config.desired(&self.schema)
    }

    /// Content files are resolved next to the project file
    pub fn resolver(&self) -> ContentResolver {
        ContentResolver::new(paths::base_dir(&self.config_path))
    }

    pub fn store(&self) -> Result<StateStore> {
        StateStore::open(&self.state_path)
    }

    /// Session talking to the configured workspace
    pub fn connect(&self) -> Result<Arc<Session>> {
        let client = self.config.workspace.client_config()?;
        let backend =
            HttpBackend::new(&client).context("Failed to set up the workspace client")?;
        log::info!("Using workspace {}", backend.host());

        Ok(Arc::new(Session {
            backend: Arc::new(backend),
            resolver: self.resolver(),
            store: self.store()?,
            schema: self.schema.clone(),
        }))
    }
}
