//! Configuration management for Arken CLI
//!
//! Stores the companion endpoint, camera, locomotion and key bindings in
//! ~/.config/arken/config.toml. `ARKEN_API_KEY`, `ARKEN_API_URL` and
//! `ARKEN_MODEL` (also read from `.env`) override the file.

use anyhow::{Context, Result};
use arken::{ActionBindings, CameraConfig, CompanionConfig, LocomotionConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR: &str = "arken";
const CONFIG_FILE: &str = "config.toml";

pub const ENV_API_KEY: &str = "ARKEN_API_KEY";
pub const ENV_API_URL: &str = "ARKEN_API_URL";
pub const ENV_MODEL: &str = "ARKEN_MODEL";

/// CLI Configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub companion: CompanionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub locomotion: LocomotionConfig,
    #[serde(default)]
    pub input: ActionBindings,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(CONFIG_DIR);
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::parse(&content)
    }

    /// Load config and apply environment overrides
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {:?}", dir))?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Override companion settings from `lookup` (blank values are ignored)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.companion.api_key = Some(key);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.companion.api_url = url;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.companion.model = model;
        }
    }

    /// Set API key; a blank key clears it
    pub fn set_api_key(&mut self, key: String) {
        let key = key.trim().to_string();
        self.companion.api_key = if key.is_empty() { None } else { Some(key) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.companion.model, "mistral");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [companion]
            model = "llama3"

            [camera]
            follow_distance = 8.0

            [input]
            jump = ["w"]
            "#,
        )
        .unwrap();

        assert_eq!(config.companion.model, "llama3");
        assert_eq!(config.companion.timeout_secs, 60);
        assert_eq!(config.camera.follow_distance, 8.0);
        assert_eq!(config.camera.height_offset, 2.0);
        assert_eq!(config.input.jump, vec![arken::Key::W]);
        assert_eq!(config.input.sprint, vec![arken::Key::LeftShift]);
    }

    #[test]
    fn test_serialized_config_parses_back() {
        let mut config = Config::default();
        config.set_api_key("sk-local".to_string());
        config.locomotion.move_speed = 7.5;

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "http://10.0.0.2:8080/v1/chat/completions"),
            (ENV_MODEL, "   "),
            (ENV_API_KEY, "sk-env"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.companion.api_url, "http://10.0.0.2:8080/v1/chat/completions");
        assert_eq!(config.companion.model, "mistral");
        assert_eq!(config.companion.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_blank_api_key_clears() {
        let mut config = Config::default();
        config.set_api_key("sk-1".to_string());
        config.set_api_key("  ".to_string());
        assert!(config.companion.api_key.is_none());
    }
}
