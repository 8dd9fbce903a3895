use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Hidden file in the home directory, outside any sandboxed app folder
const HISTORY_FILE_NAME: &str = ".clipboard_manager_history.json";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum number of entries kept in history
    pub capacity: usize,
    /// Watcher tick period
    pub poll_interval_ms: u64,
    /// Overrides the default history file location
    pub history_path: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_path: None,
        }
    }
}

impl EngineSettings {
    pub fn get_settings_path() -> EngineResult<PathBuf> {
        ProjectDirs::from("com", "antigravity", "clipboard-history")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
            .ok_or_else(|| EngineError::Config("Failed to determine config directory".to_string()))
    }

    /// Default durable history location in the user's home directory
    pub fn default_history_path() -> EngineResult<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(HISTORY_FILE_NAME))
            .ok_or_else(|| EngineError::Config("Failed to determine home directory".to_string()))
    }

    pub fn resolve_history_path(&self) -> EngineResult<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_history_path(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load settings from the per-user config file, writing defaults on first run
    pub fn load() -> EngineResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path)?;
            return Ok(settings);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read settings file: {}", e)))?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| EngineError::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validated()
    }

    pub fn save_to(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| EngineError::Config(format!("Failed to write settings file: {}", e)))
    }

    fn validated(self) -> EngineResult<Self> {
        if self.capacity == 0 {
            return Err(EngineError::Config("capacity must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::Config("poll_interval_ms must be at least 1".to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = EngineSettings::load_from(&path).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_uses_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "capacity": 10 }"#).unwrap();

        let settings = EngineSettings::load_from(&path).unwrap();
        assert_eq!(settings.capacity, 10);
        assert_eq!(settings.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(settings.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "capacity": 0 }"#).unwrap();

        assert!(matches!(EngineSettings::load_from(&path), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_history_path_override() {
        let settings = EngineSettings {
            history_path: Some(PathBuf::from("/tmp/h.json")),
            ..Default::default()
        };
        assert_eq!(settings.resolve_history_path().unwrap(), PathBuf::from("/tmp/h.json"));
    }
}
