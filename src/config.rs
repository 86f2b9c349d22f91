use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::metadata::{self, MetadataOptions};
use crate::store;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    pub fn default_value(value: T) -> Self {
        Self::new(value, ConfigSource::Default)
    }

    fn set_from_file(&mut self, value: Option<T>) {
        if let Some(value) = value {
            *self = Self::new(value, ConfigSource::File);
        }
    }
}

/// Link preview settings
#[derive(Debug, Clone, Serialize)]
pub struct MetadataConfig {
    pub proxy_url: ConfigValue<String>,
    pub fallback_proxy_url: ConfigValue<String>,
    pub timeout_secs: ConfigValue<u64>,
    pub cache_ttl_secs: ConfigValue<u64>,
    pub cache_max_entries: ConfigValue<usize>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            proxy_url: ConfigValue::default_value(metadata::DEFAULT_PROXY_URL.to_string()),
            fallback_proxy_url: ConfigValue::default_value(
                metadata::DEFAULT_FALLBACK_PROXY_URL.to_string(),
            ),
            timeout_secs: ConfigValue::default_value(metadata::DEFAULT_TIMEOUT.as_secs()),
            cache_ttl_secs: ConfigValue::default_value(metadata::DEFAULT_CACHE_TTL.as_secs()),
            cache_max_entries: ConfigValue::default_value(metadata::DEFAULT_CACHE_MAX_ENTRIES),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Document endpoint (GET/PUT)
    pub store_url: ConfigValue<Option<String>>,
    /// Secret sent with every store request
    pub api_key: ConfigValue<Option<String>>,
    /// Header carrying the secret; `Authorization: Bearer` when unset
    pub auth_header: ConfigValue<Option<String>>,
    /// Where the session file lives
    pub data_dir: ConfigValue<PathBuf>,
    pub request_timeout_secs: ConfigValue<u64>,
    pub metadata: MetadataConfig,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    store_url: Option<String>,
    api_key: Option<String>,
    auth_header: Option<String>,
    data_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    metadata: MetadataFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MetadataFile {
    proxy_url: Option<String>,
    fallback_proxy_url: Option<String>,
    timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    cache_max_entries: Option<usize>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading overrides through `env`.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::defaults();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            // Resolve a relative data dir against the config file's directory
            let data_dir = file.data_dir.map(|dir| {
                if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                }
            });

            config.store_url.set_from_file(file.store_url.map(Some));
            config.api_key.set_from_file(file.api_key.map(Some));
            config.auth_header.set_from_file(file.auth_header.map(Some));
            config.data_dir.set_from_file(data_dir);
            config
                .request_timeout_secs
                .set_from_file(file.request_timeout_secs);

            let m = &mut config.metadata;
            m.proxy_url.set_from_file(file.metadata.proxy_url);
            m.fallback_proxy_url
                .set_from_file(file.metadata.fallback_proxy_url);
            m.timeout_secs.set_from_file(file.metadata.timeout_secs);
            m.cache_ttl_secs.set_from_file(file.metadata.cache_ttl_secs);
            m.cache_max_entries
                .set_from_file(file.metadata.cache_max_entries);

            config.config_file = Some(path);
        }

        // Apply environment variable overrides
        let text = |name: &str| env(name).map(|v| ConfigValue::new(v, ConfigSource::Environment));

        if let Some(url) = text("GIFTSWAP_STORE_URL") {
            config.store_url = ConfigValue::new(Some(url.value), url.source);
        }
        if let Some(key) = text("GIFTSWAP_API_KEY") {
            config.api_key = ConfigValue::new(Some(key.value), key.source);
        }
        if let Some(header) = text("GIFTSWAP_AUTH_HEADER") {
            config.auth_header = ConfigValue::new(Some(header.value), header.source);
        }
        if let Some(dir) = text("GIFTSWAP_DATA_DIR") {
            config.data_dir = ConfigValue::new(PathBuf::from(dir.value), dir.source);
        }
        if let Some(secs) = parse_env(&env, "GIFTSWAP_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }

        let m = &mut config.metadata;
        if let Some(url) = text("GIFTSWAP_METADATA_PROXY_URL") {
            m.proxy_url = url;
        }
        if let Some(url) = text("GIFTSWAP_METADATA_FALLBACK_PROXY_URL") {
            m.fallback_proxy_url = url;
        }
        if let Some(secs) = parse_env(&env, "GIFTSWAP_METADATA_TIMEOUT_SECS")? {
            m.timeout_secs = secs;
        }
        if let Some(secs) = parse_env(&env, "GIFTSWAP_METADATA_CACHE_TTL_SECS")? {
            m.cache_ttl_secs = secs;
        }
        if let Some(entries) = parse_env(&env, "GIFTSWAP_METADATA_CACHE_MAX_ENTRIES")? {
            m.cache_max_entries = entries;
        }

        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            store_url: ConfigValue::default_value(None),
            api_key: ConfigValue::default_value(None),
            auth_header: ConfigValue::default_value(None),
            data_dir: ConfigValue::default_value(Self::default_data_dir()),
            request_timeout_secs: ConfigValue::default_value(store::DEFAULT_TIMEOUT.as_secs()),
            metadata: MetadataConfig::default(),
            config_file: None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// Options for the link preview fetcher.
    pub fn metadata_options(&self) -> MetadataOptions {
        MetadataOptions {
            proxy_url: self.metadata.proxy_url.value.clone(),
            fallback_proxy_url: self.metadata.fallback_proxy_url.value.clone(),
            timeout: Duration::from_secs(self.metadata.timeout_secs.value),
            cache_ttl: Duration::from_secs(self.metadata.cache_ttl_secs.value),
            cache_max_entries: self.metadata.cache_max_entries.value,
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/giftswap/
    /// - macOS: ~/Library/Application Support/giftswap/
    /// - Windows: %APPDATA%/giftswap/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("giftswap")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/giftswap/
    /// - macOS: ~/Library/Application Support/giftswap/
    /// - Windows: %APPDATA%/giftswap/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("giftswap")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

fn parse_env<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<ConfigValue<T>>, ConfigError> {
    match env(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(|v| Some(ConfigValue::new(v, ConfigSource::Environment)))
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        None => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value '{}' for {}", value, name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
