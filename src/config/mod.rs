use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::theme::THEME_KEY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigPathError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
}

const APP_DIR: &str = "skolarin";
const APP_CONFIG_FILE: &str = "config.json";
const DEFAULT_STORE_FILE: &str = "preferences.json";

/// Where per-user files live: `$XDG_CONFIG_HOME/skolarin`, or
/// `$HOME/.config/skolarin` when the former is unset or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDirs {
    pub xdg_config_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

impl ConfigDirs {
    pub fn from_env() -> Self {
        Self {
            xdg_config_home: std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            home: std::env::var_os("HOME").map(PathBuf::from),
        }
    }

    pub fn app_dir(&self) -> Result<PathBuf, ConfigPathError> {
        let root = match self
            .xdg_config_home
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
        {
            Some(xdg) => xdg.clone(),
            None => self
                .home
                .as_ref()
                .ok_or(ConfigPathError::MissingHomeDirectory)?
                .join(".config"),
        };
        Ok(root.join(APP_DIR))
    }

    pub fn file(&self, file_name: &str) -> Result<PathBuf, ConfigPathError> {
        Ok(self.app_dir()?.join(file_name))
    }
}

/// Settings from `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub theme_key: Option<String>,
    #[serde(default)]
    pub store_file: Option<String>,
}

impl AppConfig {
    /// Missing, unreadable or unparsable files all yield the defaults.
    pub fn load(dirs: &ConfigDirs) -> Self {
        let Ok(path) = dirs.file(APP_CONFIG_FILE) else {
            return Self::default();
        };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
                return Self::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            Self::default()
        })
    }

    pub fn theme_key(&self) -> &str {
        self.theme_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(THEME_KEY)
    }

    pub fn store_file(&self) -> &str {
        self.store_file
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_STORE_FILE)
    }

    pub fn store_path(&self, dirs: &ConfigDirs) -> Result<PathBuf, ConfigPathError> {
        dirs.file(self.store_file())
    }
}
