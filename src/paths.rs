//! Path resolution for dashctl
//!
//! # Environment Variables
//!
//! - `DASHCTL_CONFIG` - Override the project file
//! - `DASHCTL_STATE` - Override the state file
//!
//! # Path Resolution Priority
//!
//! For config_file():
//! 1. `--config` flag
//! 2. `DASHCTL_CONFIG` environment variable
//! 3. `./dashctl.toml`, if it exists
//! 4. `~/.config/dashctl/dashctl.toml`, if it exists
//! 5. `./dashctl.toml`
//!
//! For state_file():
//! 1. `--state` flag
//! 2. `DASHCTL_STATE` environment variable
//! 3. `.dashctl/state.toml` next to the config file

use std::path::{Path, PathBuf};

/// Environment variable for config file override
pub const ENV_CONFIG: &str = "DASHCTL_CONFIG";

/// Environment variable for state file override
pub const ENV_STATE: &str = "DASHCTL_STATE";

/// Project file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "dashctl.toml";

/// Get the project file path
pub fn config_file(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return expand(&path.to_string_lossy());
    }

    if let Ok(file) = std::env::var(ENV_CONFIG) {
        let path = expand(&file);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return path;
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    if let Some(home) = dirs::home_dir() {
        let user = home.join(".config").join("dashctl").join(CONFIG_FILE_NAME);
        if user.exists() {
            log::debug!("Using user config file: {}", user.display());
            return user;
        }
    }

    local
}

/// Get the state file path for a project file
pub fn state_file(flag: Option<&Path>, config: &Path) -> PathBuf {
    if let Some(path) = flag {
        return expand(&path.to_string_lossy());
    }

    if let Ok(file) = std::env::var(ENV_STATE) {
        let path = expand(&file);
        log::debug!("Using state file from {}: {}", ENV_STATE, path.display());
        return path;
    }

    base_dir(config).join(".dashctl").join("state.toml")
}

/// Directory relative paths in a project file are resolved against
pub fn base_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_flag_wins() {
        let result = config_file(Some(Path::new("/from/flag.toml")));
        assert_eq!(result, PathBuf::from("/from/flag.toml"));
    }

    #[test]
    fn test_config_env_override() {
        with_env_var(ENV_CONFIG, "/custom/dashctl.toml", || {
            assert_eq!(config_file(None), PathBuf::from("/custom/dashctl.toml"));
        });
    }

    #[test]
    fn test_state_file_resolution() {
        // One test, so the two env states don't race each other
        let config = Path::new("/project/dashctl.toml");
        let home = dirs::home_dir().unwrap();

        with_env_var(ENV_STATE, "~/dashctl-state-test.toml", || {
            assert_eq!(state_file(None, config), home.join("dashctl-state-test.toml"));
        });
        without_env_var(ENV_STATE, || {
            assert_eq!(
                state_file(None, config),
                PathBuf::from("/project/.dashctl/state.toml")
            );
        });
    }

    #[test]
    fn test_base_dir_of_bare_file_name() {
        assert_eq!(base_dir(Path::new("dashctl.toml")), PathBuf::from("."));
        assert_eq!(base_dir(Path::new("/p/dashctl.toml")), PathBuf::from("/p"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("DASHCTL_TEST_VAR", "test_value", || {
            let result = expand("/path/$DASHCTL_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
