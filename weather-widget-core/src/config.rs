use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{provider::openweather::DEFAULT_BASE_URL, storage::FileStorage};

/// Environment variable that overrides the API key from the settings file.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Application settings stored on disk.
///
/// Example TOML:
/// api_key = "..."
/// base_url = "https://api.openweathermap.org"
/// data_dir = "/home/me/.local/share/weather-widget"
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// OpenWeather API key.
    pub api_key: Option<String>,

    /// Override for the OpenWeather host.
    pub base_url: Option<String>,

    /// Where the widget configuration lives; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from disk, or return an empty default if they don't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no settings file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the settings file.
    pub fn settings_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-widget", "weather-widget")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("settings.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Effective API key: the environment wins over the file, blanks count as unset.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_env(&self, env: Option<String>) -> Option<String> {
        env.filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// File storage for the widget configuration.
    pub fn storage(&self) -> Result<FileStorage> {
        match &self.data_dir {
            Some(dir) => Ok(FileStorage::new(dir)),
            None => FileStorage::from_project_dirs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_overrides_file_key() {
        let mut settings = Settings::default();
        settings.set_api_key("FILE_KEY".into());

        assert_eq!(settings.api_key_with_env(Some("ENV_KEY".into())).as_deref(), Some("ENV_KEY"));
        assert_eq!(settings.api_key_with_env(None).as_deref(), Some("FILE_KEY"));
    }

    #[test]
    fn blank_keys_count_as_unset() {
        let settings = Settings {
            api_key: Some("  ".into()),
            ..Settings::default()
        };

        assert_eq!(settings.api_key_with_env(Some(String::new())), None);
    }

    #[test]
    fn base_url_defaults_to_openweather() {
        let mut settings = Settings::default();
        assert_eq!(settings.base_url(), "https://api.openweathermap.org");

        settings.base_url = Some("http://localhost:8080".into());
        assert_eq!(settings.base_url(), "http://localhost:8080");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.toml")).unwrap();

        assert!(settings.api_key.is_none());
        assert!(settings.data_dir.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = Settings {
            data_dir: Some(dir.path().join("data")),
            ..Settings::default()
        };
        settings.set_api_key("KEY".into());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("KEY"));
        assert_eq!(loaded.data_dir, settings.data_dir);
        assert_eq!(
            loaded.storage().unwrap().dir(),
            dir.path().join("data").as_path()
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "api_key = [").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }
}
