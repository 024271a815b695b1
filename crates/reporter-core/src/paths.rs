//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the Market Reporter base directory (~/.market-reporter).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".market-reporter"))
}

/// Get the encrypted credential store file (~/.market-reporter/credentials.json).
pub fn credentials_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("credentials.json"))
}

/// Get the OAuth login state file (~/.market-reporter/auth-state.json).
pub fn auth_state_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("auth-state.json"))
}

/// Get the master key file (~/.market-reporter/master.key).
pub fn master_key_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("master.key"))
}

/// Derive a master key path next to a file-based data store.
///
/// For a store at `/data/reporter/credentials.json` this returns
/// `/data/reporter/master.key`, so the key travels with the data it
/// protects.
pub fn master_key_file_beside(store_path: &Path) -> PathBuf {
    match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("master.key"),
        _ => PathBuf::from("master.key"),
    }
}

/// Ensure the base directory exists.
pub fn ensure_dirs() -> Result<(), ConfigError> {
    std::fs::create_dir_all(base_dir()?)?;
    Ok(())
}

/// Expand tilde (~) in a path.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
