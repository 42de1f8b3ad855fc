use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NeuroConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub assistant: AssistantConfig,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the local JSON collections.
    pub data_dir: String,
    /// Skip the remote store even when credentials are present.
    pub force_local: bool,
    /// Service-account key file for the remote store.
    pub credentials_path: Option<String>,
    /// Overrides the project id from the credentials file.
    pub project_id: Option<String>,
    /// Environment variable holding the remote store's bearer token.
    pub access_token_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssistantConfig {
    /// `"groq"` or `"disabled"`.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RecorderConfig {
    /// Transcript length (in messages) from which full-transcript
    /// re-extraction runs after every exchange.
    pub reconcile_after_messages: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_neurolinker_dir()
            .join("data")
            .to_string_lossy()
            .into_owned();
        Self {
            data_dir,
            force_local: false,
            credentials_path: None,
            project_id: None,
            access_token_env: "FIRESTORE_ACCESS_TOKEN".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: "groq".into(),
            model: "llama-3.1-8b-instant".into(),
            base_url: "https://api.groq.com/openai/v1".into(),
            api_key_env: "GROQ_API_KEY".into(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            reconcile_after_messages: 4,
        }
    }
}

/// Returns `~/.neurolinker/`, or `./.neurolinker` when there is no home directory.
pub fn default_neurolinker_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".neurolinker")
}

/// Returns the default config file path: `~/.neurolinker/config.toml`
pub fn default_config_path() -> PathBuf {
    default_neurolinker_dir().join("config.toml")
}

impl NeuroConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            NeuroConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `FORCE_JSON_DB=1` forces the local store; `FIREBASE_KEY_PATH` (or
    /// `GOOGLE_APPLICATION_CREDENTIALS`) points at remote credentials;
    /// `NEUROLINKER_DATA_DIR` and `NEUROLINKER_LOG_LEVEL` override their settings.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FORCE_JSON_DB") {
            self.storage.force_local = val == "1";
        }
        let credentials = std::env::var("FIREBASE_KEY_PATH")
            .or_else(|_| std::env::var("GOOGLE_APPLICATION_CREDENTIALS"));
        if let Ok(val) = credentials {
            if !val.is_empty() {
                self.storage.credentials_path = Some(val);
            }
        }
        if let Ok(val) = std::env::var("NEUROLINKER_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("NEUROLINKER_LOG_LEVEL") {
            self.logging.log_level = val;
        }
    }

    /// Resolve the local data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
