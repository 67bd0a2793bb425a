// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry configuration.
//!
//! Supports both programmatic (builder) and TOML file configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of consecutive transient failures tolerated before warning.
pub const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 10;

/// Default extension of local store files (`<id>.classname`).
pub const DEFAULT_FILE_EXTENSION: &str = "classname";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type ID registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory holding one file per registered type ID.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Extension of local store files, without the dot.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Consecutive transient failures tolerated before one warning is logged.
    #[serde(default = "default_failure_warn_threshold")]
    pub failure_warn_threshold: u32,

    /// fsync temp files before renaming them into place.
    #[serde(default = "default_true")]
    pub sync_writes: bool,

    /// Remove leftover temp files when the local store is opened.
    #[serde(default = "default_true")]
    pub cleanup_temp_on_open: bool,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("work").join("marshaller")
}

fn default_file_extension() -> String {
    DEFAULT_FILE_EXTENSION.to_string()
}

fn default_failure_warn_threshold() -> u32 {
    DEFAULT_FAILURE_WARN_THRESHOLD
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            file_extension: default_file_extension(),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
            sync_writes: true,
            cleanup_temp_on_open: true,
        }
    }
}

impl RegistryConfig {
    /// Create a new config builder
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("work_dir is empty".into()));
        }

        let ext = &self.file_extension;
        if ext.is_empty() {
            return Err(ConfigError::Invalid("file_extension is empty".into()));
        }
        if ext.starts_with('.') || ext.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "file_extension '{}' must be a bare extension",
                ext
            )));
        }
        if ext == crate::local_store::TEMP_EXTENSION {
            return Err(ConfigError::Invalid(format!(
                "file_extension '{}' is reserved for temp files",
                ext
            )));
        }

        if self.failure_warn_threshold == 0 {
            return Err(ConfigError::Invalid(
                "failure_warn_threshold must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`RegistryConfig`].
#[derive(Debug, Default)]
pub struct RegistryConfigBuilder {
    work_dir: Option<PathBuf>,
    file_extension: Option<String>,
    failure_warn_threshold: Option<u32>,
    sync_writes: Option<bool>,
    cleanup_temp_on_open: Option<bool>,
}

impl RegistryConfigBuilder {
    /// Set the local store directory
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Set the local store file extension (without the dot)
    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = Some(ext.into());
        self
    }

    /// Set the consecutive-failure warning threshold
    pub fn failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.failure_warn_threshold = Some(threshold);
        self
    }

    /// fsync local writes before rename (default: true)
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = Some(sync);
        self
    }

    /// Remove stale temp files on open (default: true)
    pub fn cleanup_temp_on_open(mut self, cleanup: bool) -> Self {
        self.cleanup_temp_on_open = Some(cleanup);
        self
    }

    /// Build the configuration
    pub fn build(self) -> RegistryConfig {
        let defaults = RegistryConfig::default();

        RegistryConfig {
            work_dir: self.work_dir.unwrap_or(defaults.work_dir),
            file_extension: self.file_extension.unwrap_or(defaults.file_extension),
            failure_warn_threshold: self
                .failure_warn_threshold
                .unwrap_or(defaults.failure_warn_threshold),
            sync_writes: self.sync_writes.unwrap_or(defaults.sync_writes),
            cleanup_temp_on_open: self
                .cleanup_temp_on_open
                .unwrap_or(defaults.cleanup_temp_on_open),
        }
    }
}
