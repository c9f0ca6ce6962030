//! Configuration system
//!
//! Handles loading configuration from multiple sources:
//! - Global config (~/.config/planai/config.toml)
//! - Project config (./planai.toml or .planai/config.toml)
//! - Environment variables (PLANAI_*, GOOGLE_API_KEY / API_KEY)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where workspace data is stored (defaults to the platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Provider used by the assistant
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Model ids per assistant feature
    #[serde(default)]
    pub models: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_provider: default_provider(),
            providers: HashMap::new(),
            models: ModelConfig::default(),
        }
    }
}

fn default_provider() -> String {
    "google".to_string()
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// API key (can also be set via env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("api_key_len", &self.api_key.as_ref().map(|k| k.len()))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Which model each assistant feature uses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    /// Subtask and description suggestions
    #[serde(default = "default_fast_model")]
    pub fast: String,

    /// Strategy and workflow analysis
    #[serde(default = "default_smart_model")]
    pub smart: String,

    /// Conversational assistant
    #[serde(default = "default_chat_model")]
    pub chat: String,

    /// Task cover images
    #[serde(default = "default_image_model")]
    pub image: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            smart: default_smart_model(),
            chat: default_chat_model(),
            image: default_image_model(),
        }
    }
}

fn default_fast_model() -> String {
    "gemini-2.0-flash-lite-preview-02-05".to_string()
}

fn default_smart_model() -> String {
    "gemini-2.0-flash-thinking-exp-01-21".to_string()
}

fn default_chat_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

/// Fields of a config file; everything optional so layers only override what they set
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigLayer {
    data_dir: Option<PathBuf>,
    default_provider: Option<String>,
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    models: ModelLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ModelLayer {
    fast: Option<String>,
    smart: Option<String>,
    chat: Option<String>,
    image: Option<String>,
}

impl Config {
    /// Load configuration from all sources (global, project, env)
    pub async fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            config = config.merge(read_layer(&global_path).await?);
        }

        // Load project config
        for name in ["planai.toml", ".planai/config.toml"] {
            let path = PathBuf::from(name);
            if path.exists() {
                config = config.merge(read_layer(&path).await?);
            }
        }

        // Apply environment overrides
        config.apply_env();

        Ok(config)
    }

    /// Get the global config directory path
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("ai", "planai", "planai")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the platform data directory path
    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("ai", "planai", "planai").map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Data directory to use: configured, platform default, or temp
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(Self::data_dir)
            .unwrap_or_else(|| std::env::temp_dir().join("planai"))
    }

    /// Initialize default configuration file
    pub async fn init_default() -> Result<()> {
        if let Some(path) = Self::global_config_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let default = Self::default();
            let content = toml::to_string_pretty(&default)?;
            fs::write(&path, content).await?;
            tracing::info!("Created config at {:?}", path);
        }
        Ok(())
    }

    /// Set a configuration value
    pub async fn set(key: &str, value: &str) -> Result<()> {
        let mut config = Self::load().await?;
        config.set_value(key, value)?;

        // Save to global config
        if let Some(path) = Self::global_config_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let content = toml::to_string_pretty(&config)?;
            fs::write(&path, content).await?;
            tracing::info!(key = %key, "Config value updated");
        }

        Ok(())
    }

    /// Apply a dotted-key assignment in memory
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "default_provider" => self.default_provider = value.to_string(),
            "models.fast" => self.models.fast = value.to_string(),
            "models.smart" => self.models.smart = value.to_string(),
            "models.chat" => self.models.chat = value.to_string(),
            "models.image" => self.models.image = value.to_string(),
            _ => {
                let Some((provider, field)) = key
                    .strip_prefix("providers.")
                    .and_then(|rest| rest.split_once('.'))
                else {
                    anyhow::bail!("Unknown config key: {}", key);
                };
                let entry = self.providers.entry(provider.to_string()).or_default();
                match field {
                    "api_key" => entry.api_key = Some(value.to_string()),
                    "base_url" => entry.base_url = Some(value.to_string()),
                    _ => anyhow::bail!("Unknown config key: {}", key),
                }
            }
        }
        Ok(())
    }

    /// Merge a layer over this config (the layer takes precedence)
    fn merge(mut self, other: ConfigLayer) -> Self {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if let Some(provider) = other.default_provider {
            self.default_provider = provider;
        }
        for (name, provider) in other.providers {
            let entry = self.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.base_url.is_some() {
                entry.base_url = provider.base_url;
            }
        }
        if let Some(model) = other.models.fast {
            self.models.fast = model;
        }
        if let Some(model) = other.models.smart {
            self.models.smart = model;
        }
        if let Some(model) = other.models.chat {
            self.models.chat = model;
        }
        if let Some(model) = other.models.image {
            self.models.image = model;
        }
        self
    }

    /// Apply environment variable overrides
    fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("PLANAI_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = var("PLANAI_MODEL_FAST") {
            self.models.fast = val;
        }
        if let Some(val) = var("PLANAI_MODEL_SMART") {
            self.models.smart = val;
        }
        if let Some(val) = var("PLANAI_MODEL_CHAT") {
            self.models.chat = val;
        }
        if let Some(val) = var("PLANAI_MODEL_IMAGE") {
            self.models.image = val;
        }
        if let Some(val) = var("GOOGLE_API_KEY").or_else(|| var("API_KEY")) {
            self.providers
                .entry("google".to_string())
                .or_default()
                .api_key = Some(val);
        }
    }
}

async fn read_layer(path: &Path) -> Result<ConfigLayer> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}
