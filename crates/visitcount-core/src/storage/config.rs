//! TOML-based application configuration.
//!
//! Stores:
//! - Counter identity (namespace, site key)
//! - The ordered source chain and proxy list
//! - Estimator and display tuning
//!
//! Configuration is stored at `~/.config/visitcount/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::animator::{DEFAULT_DURATION_MS, LOADING_PLACEHOLDER};
use crate::error::ConfigError;
use crate::estimator::Estimator;
use crate::key::CounterKey;
use crate::sources::{default_proxies, default_sources, CounterSource, Proxy};

/// Source chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_sources")]
    pub sources: Vec<CounterSource>,
    #[serde(default = "default_proxies")]
    pub proxies: Vec<Proxy>,
}

/// Estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Hour, weekday and jitter scaling.
    #[serde(default = "default_true")]
    pub modulation: bool,
    /// Fixed jitter seed (unset = random).
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/visitcount/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site identifier every counter is scoped under.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Key of the site-wide counter.
    #[serde(default = "default_site_key")]
    pub site_key: String,
    #[serde(default = "default_launch_date")]
    pub launch_date: NaiveDate,
    /// Also count visits per page path.
    #[serde(default = "default_true")]
    pub track_pages: bool,
    /// Session flags untouched for this long are discarded.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

// Default functions
fn default_namespace() -> String {
    "example.com".into()
}
fn default_site_key() -> String {
    "site-total".into()
}
fn default_launch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 2).unwrap_or_default()
}
fn default_session_ttl_hours() -> u64 {
    24
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_duration_ms() -> u64 {
    DEFAULT_DURATION_MS
}
fn default_placeholder() -> String {
    LOADING_PLACEHOLDER.into()
}
fn default_true() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            sources: default_sources(),
            proxies: default_proxies(),
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            modulation: true,
            seed: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            placeholder: default_placeholder(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            site_key: default_site_key(),
            launch_date: default_launch_date(),
            track_pages: true,
            session_ttl_hours: default_session_ttl_hours(),
            resolver: ResolverConfig::default(),
            estimator: EstimatorConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::Null => match value.parse::<u64>() {
                        Ok(n) => serde_json::Value::Number(n.into()),
                        Err(_) if value == "none" => serde_json::Value::Null,
                        Err(_) => serde_json::Value::String(value.into()),
                    },
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    ///
    /// Any other read failure is an error and leaves the file untouched.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check that every source and proxy points at an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sources = self
            .resolver
            .sources
            .iter()
            .map(|s| (format!("resolver.sources.{}", s.name), s.base_url.as_str()));
        let proxies = self
            .resolver
            .proxies
            .iter()
            .map(|p| (format!("resolver.proxies.{}", p.name), p.prefix.as_str()));

        for (key, raw) in sources.chain(proxies) {
            let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                key: key.clone(),
                message: format!("'{raw}': {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// The site-wide counter.
    pub fn site_key(&self) -> CounterKey {
        CounterKey::new(&self.namespace, &self.site_key)
    }

    /// The per-page counter for `path`.
    pub fn page_key(&self, path: &str) -> CounterKey {
        CounterKey::for_page(&self.namespace, path)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours.saturating_mul(3600))
    }

    /// Estimator built from the configured launch date and tuning.
    pub fn estimator(&self) -> Estimator {
        let est = Estimator::new(self.launch_date).with_modulation(self.estimator.modulation);
        match self.estimator.seed {
            Some(seed) => est.with_seed(seed),
            None => est,
        }
    }
}
