//! Project file
//!
//! ```toml
//! [workspace]
//! host = "https://example.cloud.databricks.com"
//! token_env = "DATABRICKS_TOKEN"
//!
//! [dashboards.sales]
//! display_name = "Sales"
//! parent_path = "/Shared/reports"
//! warehouse_id = "abc123"
//! file_path = "dashboards/sales.lvdash.json"
//! ```

use crate::dashboard::schema::ResourceSchema;
use crate::dashboard::{ContentSpecification, DesiredDashboard};
use anyhow::{Context, Result, bail};
use lakeview::ClientConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `workspace.host`
pub const ENV_HOST: &str = "DATABRICKS_HOST";

fn default_token_env() -> String {
    "DATABRICKS_TOKEN".to_string()
}

// ============================================================================
// Project Config
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub dashboards: BTreeMap<String, DashboardConfig>,
}

impl ProjectConfig {
    /// Load a project file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid project file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check every dashboard against the schema
    ///
    /// Messages are prefixed with the dashboard's address.
    pub fn validate(&self, schema: &ResourceSchema) -> Vec<String> {
        self.dashboards
            .iter()
            .flat_map(|(name, dashboard)| {
                schema
                    .validate(&dashboard.present_fields())
                    .into_iter()
                    .map(move |problem| format!("dashboard.{name}: {problem}"))
            })
            .collect()
    }

    /// Declared dashboards with defaults applied
    pub fn desired(&self, schema: &ResourceSchema) -> Result<BTreeMap<String, DesiredDashboard>> {
        let problems = self.validate(schema);
        if !problems.is_empty() {
            bail!("Invalid configuration:\n  {}", problems.join("\n  "));
        }

        let embed_default = schema.default_bool("embed_credentials").unwrap_or(true);
        self.dashboards
            .iter()
            .map(|(name, dashboard)| {
                let desired = dashboard
                    .to_desired(embed_default)
                    .with_context(|| format!("Invalid dashboard {name}"))?;
                Ok((name.clone(), desired))
            })
            .collect()
    }
}

// ============================================================================
// Workspace Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub host: Option<String>,
    /// Name of the environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            host: None,
            token_env: default_token_env(),
            timeout_secs: None,
        }
    }
}

impl WorkspaceConfig {
    /// Client settings from this section and the process environment
    pub fn client_config(&self) -> Result<ClientConfig> {
        self.client_config_with(|key| std::env::var(key).ok())
    }

    /// Client settings, looking up environment variables with `env`
    pub fn client_config_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        let host = env(ENV_HOST)
            .or_else(|| self.host.clone())
            .with_context(|| format!("No workspace host: set workspace.host or {ENV_HOST}"))?;
        let token = env(&self.token_env)
            .with_context(|| format!("No access token: set {}", self.token_env))?;

        let mut config = ClientConfig::new(host, token);
        if let Some(secs) = self.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Dashboard Config
// ============================================================================

/// One `[dashboards.<name>]` table as written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub display_name: Option<String>,
    pub parent_path: Option<String>,
    pub warehouse_id: Option<String>,
    pub embed_credentials: Option<bool>,
    pub serialized_dashboard: Option<String>,
    pub file_path: Option<PathBuf>,
    /// Keys that are not part of the above; reported by validation
    #[serde(flatten)]
    pub other: BTreeMap<String, toml::Value>,
}

impl DashboardConfig {
    /// Names of the attributes that are set
    pub fn present_fields(&self) -> BTreeSet<&str> {
        let known = [
            ("display_name", self.display_name.is_some()),
            ("parent_path", self.parent_path.is_some()),
            ("warehouse_id", self.warehouse_id.is_some()),
            ("embed_credentials", self.embed_credentials.is_some()),
            ("serialized_dashboard", self.serialized_dashboard.is_some()),
            ("file_path", self.file_path.is_some()),
        ];
        known
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .chain(self.other.keys().map(String::as_str))
            .collect()
    }

    fn to_desired(&self, embed_default: bool) -> Result<DesiredDashboard> {
        let content =
            ContentSpecification::from_fields(self.serialized_dashboard.clone(), self.file_path.clone())?;
        Ok(DesiredDashboard {
            display_name: self.display_name.clone().unwrap_or_default(),
            parent_path: self.parent_path.clone().unwrap_or_default(),
            warehouse_id: self.warehouse_id.clone().unwrap_or_default(),
            embed_credentials: self.embed_credentials.unwrap_or(embed_default),
            content,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
