//! Application configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CLIENT_ID_ENV: &str = "TUBE_VAULT_GOOGLE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "TUBE_VAULT_GOOGLE_CLIENT_SECRET";

/// Main application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub lookup: LookupConfig,
    pub datastore: DatastoreConfig,
    pub llm: LlmConfig,
    pub advanced: AdvancedConfig,
}

/// OAuth client registration used for sign-in and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>, // required by Google for desktop clients
    pub scopes: Vec<String>,
    pub redirect_uri: Option<String>, // loopback on a random port when unset
    pub sign_in_timeout_seconds: u64,
}

/// Video lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub debounce_ms: u64,
    pub user_agent: String,
    pub request_timeout_seconds: u64,
    pub caption_language: Option<String>,
}

/// Local vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    pub data_dir: Option<String>,
    pub embedding_dimension: usize,
}

/// Model provider configuration (token and model live in the settings record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: String,
    pub embedding_model: String,
    pub refine_model: String,
    pub chunk_chars: usize,
}

/// Advanced configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    pub log_level: String, // "error", "warn", "info", "debug", "trace"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            lookup: LookupConfig::default(),
            datastore: DatastoreConfig::default(),
            llm: LlmConfig::default(),
            advanced: AdvancedConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            redirect_uri: None,
            sign_in_timeout_seconds: 300,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            user_agent: crate::utils::get_user_agent().to_string(),
            request_timeout_seconds: 30,
            caption_language: None,
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            embedding_dimension: 1024,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai/v1".to_string(),
            embedding_model: "mistral-embed".to_string(),
            refine_model: "mistral-medium".to_string(),
            chunk_chars: 3000,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, creating default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: AppConfig =
                serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

            tracing::info!("Loaded configuration from: {:?}", config_path);
            config
        } else {
            let config = Self::default();
            config.save()?;
            tracing::info!("Created default configuration at: {:?}", config_path);
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            crate::utils::ensure_dir_exists(parent)?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved configuration to: {:?}", config_path);
        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "tubevault", "tube-vault")
            .with_context(|| "Failed to get project directories")
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    /// Get the application data directory
    pub fn get_data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Directory holding the vector store collections
    pub fn vector_store_dir(&self) -> Result<PathBuf> {
        match &self.datastore.data_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(Self::get_data_dir()?.join("vectors")),
        }
    }

    /// Reset configuration to defaults
    pub fn reset() -> Result<Self> {
        Self::reset_at(&Self::get_config_path()?)
    }

    fn reset_at(config_path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save_to(config_path)?;
        tracing::info!("Reset configuration to defaults");
        Ok(config)
    }

    /// Export configuration as JSON string
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Failed to export configuration")
    }

    /// Parse and validate configuration from a JSON string without saving it
    pub fn parse(json: &str) -> Result<Self> {
        let config: AppConfig =
            serde_json::from_str(json).with_context(|| "Failed to parse imported configuration")?;

        config
            .validate()
            .with_context(|| "Imported configuration is invalid")?;
        Ok(config)
    }

    /// Import configuration from JSON string
    pub fn import(json: &str) -> Result<Self> {
        Self::import_to(json, &Self::get_config_path()?)
    }

    fn import_to(json: &str, config_path: &Path) -> Result<Self> {
        let config = Self::parse(json)?;
        config.save_to(config_path)?;
        tracing::info!("Imported and validated configuration from JSON");
        Ok(config)
    }

    /// Credentials may be supplied by the environment instead of the file
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(client_id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
            self.auth.client_id = client_id;
        }
        if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.auth.client_secret = Some(secret);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.auth.scopes.is_empty() {
            anyhow::bail!("At least one OAuth scope is required");
        }

        if self.auth.sign_in_timeout_seconds == 0 || self.auth.sign_in_timeout_seconds > 3600 {
            anyhow::bail!("Sign-in timeout should be between 1 and 3600 seconds");
        }

        if let Some(ref redirect) = self.auth.redirect_uri {
            let parsed = crate::utils::validate_url(redirect)?;
            if parsed.scheme() != "http" {
                anyhow::bail!("Redirect URI must be a loopback http:// address");
            }
        }

        if self.lookup.debounce_ms > 10_000 {
            anyhow::bail!("Debounce delay should not exceed 10000 ms");
        }

        if self.lookup.request_timeout_seconds == 0 || self.lookup.request_timeout_seconds > 300 {
            anyhow::bail!("Request timeout should be between 1 and 300 seconds");
        }

        if self.datastore.embedding_dimension == 0 {
            anyhow::bail!("Embedding dimension must be greater than 0");
        }

        crate::utils::validate_url(&self.llm.api_base)?;

        if self.llm.chunk_chars < 100 {
            anyhow::bail!("Chunk size should be at least 100 characters");
        }

        if !["error", "warn", "info", "debug", "trace"].contains(&self.advanced.log_level.as_str())
        {
            anyhow::bail!(
                "Invalid log level: must be 'error', 'warn', 'info', 'debug', or 'trace'"
            );
        }

        Ok(())
    }
}
