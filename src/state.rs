use crate::dashboard::PersistedState;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

// ============================================================================
// State File
// ============================================================================

/// Everything dashctl remembers between runs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Tracked dashboards, keyed by the name used in the config
    #[serde(default)]
    pub dashboards: BTreeMap<String, PersistedState>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            dashboards: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: StateFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// State Store
// ============================================================================

/// Shared, write-through handle on the state file
///
/// Writes from parallel applies are serialised by the mutex and every write
/// persists the whole file, so a crash loses at most the write in flight.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    file: Mutex<StateFile>,
}

impl StateStore {
    /// Open the state file at `path`; a missing file is an empty state
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = StateFile::load(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded state of a dashboard by config name
    pub fn get(&self, name: &str) -> Option<PersistedState> {
        self.lock().dashboards.get(name).cloned()
    }

    /// Names of all tracked dashboards
    pub fn names(&self) -> Vec<String> {
        self.lock().dashboards.keys().cloned().collect()
    }

    /// Find the config name tracking a remote dashboard id
    pub fn find_by_remote_id(&self, dashboard_id: &str) -> Option<(String, PersistedState)> {
        self.lock()
            .dashboards
            .iter()
            .find(|(_, state)| state.dashboard_id == dashboard_id)
            .map(|(name, state)| (name.clone(), state.clone()))
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> StateFile {
        self.lock().clone()
    }

    /// Record the state of a dashboard and persist
    pub fn record(&self, name: &str, state: PersistedState) -> Result<()> {
        let mut file = self.lock();
        file.dashboards.insert(name.to_string(), state);
        self.persist(&mut file)
    }

    /// Stop tracking a dashboard and persist
    ///
    /// Returns the state that was removed, if any.
    pub fn forget(&self, name: &str) -> Result<Option<PersistedState>> {
        let mut file = self.lock();
        let removed = file.dashboards.remove(name);
        if removed.is_some() {
            self.persist(&mut file)?;
        }
        Ok(removed)
    }

    fn persist(&self, file: &mut StateFile) -> Result<()> {
        file.last_updated = Utc::now();
        file.save(&self.path)
    }

    fn lock(&self) -> MutexGuard<'_, StateFile> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================
