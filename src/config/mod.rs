//! Configuration management for imgmirror

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::KeyScheme;
use crate::client::http::{DEFAULT_REQUESTS_PER_SECOND, DEFAULT_TIMEOUT};
use crate::error::{ConfigError, Result, StoreError};
use crate::mirror::{
    DEFAULT_MAX_CONCURRENT, DEFAULT_MOUNT, ExtensionPrecedence, MirrorOptions, ReferenceScanner,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory served as the site root
    #[serde(default = "default_public_root")]
    pub public_root: PathBuf,

    /// Public URL prefix for mirrored images, also their path under `public_root`
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Per-download timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Downloads in flight per document
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default)]
    pub key_scheme: KeyScheme,

    #[serde(default)]
    pub extension_precedence: ExtensionPrecedence,

    /// Regex for bare provider URLs; empty disables the bare scan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_pattern: Option<String>,

    /// Content store connection
    #[serde(default)]
    pub store: StoreConfig,
}

/// PostgREST content store settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
}

fn default_public_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_mount() -> String {
    DEFAULT_MOUNT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

fn default_requests_per_second() -> u32 {
    DEFAULT_REQUESTS_PER_SECOND
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_root: default_public_root(),
            mount: default_mount(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_downloads: default_max_concurrent(),
            requests_per_second: default_requests_per_second(),
            key_scheme: KeyScheme::default(),
            extension_precedence: ExtensionPrecedence::default(),
            provider_pattern: None,
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".imgmirror").join("config.yaml"))
    }

    /// Resolve the config path: explicit path or the default location
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an explicit path or the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(Path::new(p)),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        // An empty file is a valid, all-defaults config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Apply `SUPABASE_URL` / `SUPABASE_ANON_KEY` from the environment
    pub fn with_env_overrides(self) -> Self {
        self.with_store_overrides(
            std::env::var("SUPABASE_URL").ok(),
            std::env::var("SUPABASE_ANON_KEY").ok(),
        )
    }

    /// Override store settings with any non-empty values given
    pub fn with_store_overrides(mut self, url: Option<String>, anon_key: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.store.url = Some(url);
        }
        if let Some(key) = anon_key.filter(|k| !k.is_empty()) {
            self.store.anon_key = Some(key);
        }
        self
    }

    /// Check settings that would otherwise fail late or silently
    pub fn validate(&self) -> Result<()> {
        if !self.mount.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "mount must start with '/', got {:?}",
                self.mount
            ))
            .into());
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_downloads must be at least 1".to_string(),
            )
            .into());
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".to_string()).into());
        }
        self.scanner()?;
        Ok(())
    }

    /// Directory mirrored images are written to
    pub fn storage_root(&self) -> PathBuf {
        self.public_root
            .join(self.mount.trim_start_matches('/').trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            mount: self.mount.clone(),
            key_scheme: self.key_scheme,
            extension_precedence: self.extension_precedence,
            max_concurrent: self.max_concurrent_downloads,
        }
    }

    /// Reference scanner for the configured provider pattern
    pub fn scanner(&self) -> Result<ReferenceScanner> {
        match &self.provider_pattern {
            None => Ok(ReferenceScanner::default()),
            Some(pattern) => ReferenceScanner::new(Some(pattern)).map_err(|e| {
                ConfigError::Invalid(format!("provider_pattern is not a valid regex: {}", e))
                    .into()
            }),
        }
    }

    /// Content store URL and key, if both are set
    pub fn store_credentials(&self) -> Result<(&str, &str)> {
        match (self.store.url.as_deref(), self.store.anon_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(StoreError::NotConfigured.into()),
        }
    }
}
