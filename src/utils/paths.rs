//! Cross-Platform Path Utilities
//!
//! Functions for resolving the engine's directories across platforms.

use std::path::{Path, PathBuf};

use crate::utils::error::{EngineError, EngineResult};

/// Get the platform config directory
pub fn config_dir() -> EngineResult<PathBuf> {
    dirs::config_dir().ok_or_else(|| EngineError::config("Could not determine config directory"))
}

/// Get the phasewright directory (`<config_dir>/phasewright/`)
pub fn phasewright_dir() -> EngineResult<PathBuf> {
    Ok(config_dir()?.join("phasewright"))
}

/// Get the config file path (`<config_dir>/phasewright/config.json`)
pub fn config_path() -> EngineResult<PathBuf> {
    Ok(phasewright_dir()?.join("config.json"))
}

/// Get the job database path (`<config_dir>/phasewright/jobs.db`)
pub fn database_path() -> EngineResult<PathBuf> {
    Ok(phasewright_dir()?.join("jobs.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> EngineResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
