//! Content resolution and fingerprinting
//!
//! A dashboard's definition comes either inline from the config or from a
//! file next to it. Both are resolved to text plus a BLAKE3 fingerprint that
//! is only used to notice byte-level changes.

use super::error::{ControllerError, Result};
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a dashboard's definition comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpecification {
    /// Serialized dashboard given directly
    Inline(String),
    /// Path to a `.lvdash.json` file
    File(PathBuf),
}

impl ContentSpecification {
    /// Build from the two optional config fields
    ///
    /// Setting both is an error. Setting neither yields `None`; whether that
    /// is acceptable depends on the [`ResolveContext`].
    pub fn from_fields(inline: Option<String>, file: Option<PathBuf>) -> Result<Option<Self>> {
        match (inline, file) {
            (Some(_), Some(_)) => Err(ControllerError::Configuration(
                "serialized_dashboard and file_path are mutually exclusive".to_string(),
            )),
            (Some(content), None) => Ok(Some(Self::Inline(content))),
            (None, Some(path)) => Ok(Some(Self::File(path))),
            (None, None) => Ok(None),
        }
    }
}

/// Which lifecycle operation content is being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveContext {
    /// Content is mandatory
    Create,
    /// Missing content leaves the remote definition untouched
    Update,
}

/// Effective content and its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub content: String,
    pub fingerprint: String,
}

/// Hex BLAKE3 digest of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Resolves content specifications relative to a base directory
#[derive(Debug, Clone)]
pub struct ContentResolver {
    base_dir: PathBuf,
}

impl ContentResolver {
    /// Relative file paths are resolved against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory relative paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute location of a content file after `~`/`$VAR` expansion
    pub fn locate(&self, path: &Path) -> PathBuf {
        let expanded = paths::expand(&path.to_string_lossy());
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    /// Resolve content for `context`
    ///
    /// Returns `Ok(None)` only for an update without any content source.
    pub fn resolve(
        &self,
        spec: Option<&ContentSpecification>,
        context: ResolveContext,
    ) -> Result<Option<ResolvedContent>> {
        let content = match (spec, context) {
            (None, ResolveContext::Create) => {
                return Err(ControllerError::Configuration(
                    "one of serialized_dashboard or file_path must be set".to_string(),
                ));
            }
            (None, ResolveContext::Update) => return Ok(None),
            (Some(ContentSpecification::Inline(content)), _) => content.clone(),
            (Some(ContentSpecification::File(path)), _) => {
                let location = self.locate(path);
                log::debug!("Reading dashboard content from {}", location.display());
                fs::read_to_string(&location).map_err(|source| {
                    ControllerError::ContentUnavailable {
                        path: location.clone(),
                        source,
                    }
                })?
            }
        };

        Ok(Some(ResolvedContent {
            fingerprint: fingerprint(content.as_bytes()),
            content,
        }))
    }
}
