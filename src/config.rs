//! Configuration types for the planner workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PlaninkError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaninkConfig {
    /// Drawing autosave timing.
    pub autosave: AutosaveConfig,
    /// Entity store location.
    pub store: StoreConfig,
    /// Identity used by the host bridge.
    pub identity: IdentityConfig,
}

/// Drawing autosave timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save fires (ms).
    pub debounce_ms: u64,
    /// Fixed interval of the fallback save, independent of edits (ms).
    pub periodic_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            periodic_ms: 3_000,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn periodic(&self) -> Duration {
        Duration::from_millis(self.periodic_ms)
    }
}

/// Entity store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `planink.db`.
    pub root_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: default_store_root_dir(),
        }
    }
}

/// Identity used by the host bridge.
///
/// When `owner` is unset the bridge falls back to `PLANINK_OWNER`; with
/// neither present every command is rejected as unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub owner: Option<String>,
}

fn default_store_root_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        home.join(".planink")
    } else {
        PathBuf::from("/tmp").join(".planink")
    }
}

impl PlaninkConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| PlaninkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlaninkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject timer values the autosave scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.autosave.debounce_ms == 0 {
            return Err(PlaninkError::Config(
                "autosave.debounce_ms must be greater than zero".to_owned(),
            ));
        }
        if self.autosave.periodic_ms == 0 {
            return Err(PlaninkError::Config(
                "autosave.periodic_ms must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path: `~/.config/planink/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("planink").join("config.toml")
        } else if let Some(config) = dirs::config_dir() {
            config.join("planink").join("config.toml")
        } else {
            PathBuf::from("/tmp/planink-config/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_autosave_timings() {
        let config = PlaninkConfig::default();
        assert_eq!(config.autosave.debounce(), Duration::from_millis(300));
        assert_eq!(config.autosave.periodic(), Duration::from_millis(3_000));
        assert!(config.identity.owner.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = PlaninkConfig::default();
        config.autosave.debounce_ms = 150;
        config.store.root_dir = dir.path().join("data");
        config.identity.owner = Some("alice".to_owned());

        config.save_to_file(&path).expect("save");
        let loaded = PlaninkConfig::from_file(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[autosave]\nperiodic_ms = 5000\n").expect("write");

        let loaded = PlaninkConfig::from_file(&path).expect("load");
        assert_eq!(loaded.autosave.debounce_ms, 300);
        assert_eq!(loaded.autosave.periodic_ms, 5_000);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[autosave]\ndebounce_ms = 0\n").expect("write");

        let err = PlaninkConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PlaninkError::Config(_)));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");

        assert!(PlaninkConfig::from_file(&path).is_err());
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = PlaninkConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(PlaninkError::Io(_))));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = PlaninkConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("planink"));
    }
}
