use crate::visualization::DEFAULT_WINDOW_SIZE;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_DIR_ENV: &str = "SEQVIEW_SETTINGS_DIR";
const CONFIG_FILE: &str = "config.json";

/// Application level configuration, read from `config.json` in the
/// application directory. Missing fields fall back to defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub settings_dir: PathBuf,
    pub window_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { settings_dir: default_settings_dir(), window_size: DEFAULT_WINDOW_SIZE }
    }
}

impl AppConfig {
    /// Load `path` if it exists, otherwise the defaults. The settings directory
    /// environment variable wins over both.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.is_file() {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config file {:?}", path))?
        } else {
            Self::default()
        };
        if let Some(dir) = std::env::var_os(SETTINGS_DIR_ENV) {
            config.settings_dir = settings_dir_override(dir, config.settings_dir);
        }
        info!("[CONFIG] Preferences in {:?}", config.settings_dir);
        Ok(config)
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&config_file_path())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }
}

// An empty override is ignored.
fn settings_dir_override(value: OsString, current: PathBuf) -> PathBuf {
    if value.is_empty() {
        current
    } else {
        PathBuf::from(value)
    }
}

fn app_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = home::home_dir() {
            return home.join("Library").join("Application Support").join("seqview");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(base) = std::env::var_os("APPDATA") {
            return PathBuf::from(base).join("seqview");
        }
    }

    // Linux / fallback: XDG or ~/.config
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(base).join("seqview")
    } else if let Some(home) = home::home_dir() {
        home.join(".config").join("seqview")
    } else {
        PathBuf::from(".seqview")
    }
}

pub fn default_settings_dir() -> PathBuf {
    app_dir().join("prefs")
}

pub fn config_file_path() -> PathBuf {
    app_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dir_is_prefs_subdirectory() {
        let dir = default_settings_dir();
        assert!(dir.ends_with("prefs"));
        assert_eq!(dir.parent(), config_file_path().parent());
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "window_size": 1024 }"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.window_size, 1024);
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        let config = AppConfig { settings_dir: tmp.path().join("p"), window_size: 640 };
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.window_size, 640);
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let current = PathBuf::from("/tmp/current");
        assert_eq!(settings_dir_override(OsString::new(), current.clone()), current);
        assert_eq!(
            settings_dir_override(OsString::from("/tmp/other"), current),
            PathBuf::from("/tmp/other")
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ window_size: }").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
