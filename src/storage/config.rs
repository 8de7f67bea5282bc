//! JSON Configuration Management
//!
//! Handles reading and writing the engine configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::EngineConfig;
use crate::utils::error::{EngineError, EngineResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for the engine settings file
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: EngineConfig,
}

impl ConfigService {
    /// Open the default config file, creating it with defaults if missing
    pub fn new() -> EngineResult<Self> {
        Self::open(&config_path()?)
    }

    /// Open a config file at `path`, creating it with defaults if missing
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            let default_config = EngineConfig::default();
            Self::save_to_file(path, &default_config)?;
            tracing::info!("[ConfigService] Wrote default config to {}", path.display());
            default_config
        };

        Ok(Self {
            config_path: path.to_path_buf(),
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> EngineResult<EngineConfig> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate().map_err(EngineError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &EngineConfig) -> EngineResult<()> {
        config.validate().map_err(EngineError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> EngineConfig {
        self.config.clone()
    }

    /// Apply an in-place edit, then validate and save.
    ///
    /// A rejected edit leaves both memory and disk unchanged.
    pub fn update_config<F>(&mut self, edit: F) -> EngineResult<EngineConfig>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut updated = self.config.clone();
        edit(&mut updated);
        Self::save_to_file(&self.config_path, &updated)?;
        self.config = updated;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> EngineResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> EngineResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> EngineResult<()> {
        self.config = EngineConfig::default();
        self.save()
    }

    /// Check if the config service is healthy
    pub fn is_healthy(&self) -> bool {
        self.config_path.exists() && self.config.validate().is_ok()
    }
}
