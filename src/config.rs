use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Environment variable that overrides `access-key` from the config file.
pub const ACCESS_KEY_ENV: &str = "LATCH_ACCESS_KEY";

/// API credential. Never printed in full.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            f.write_str("AccessKey(<unset>)")
        } else {
            f.write_str("AccessKey(<redacted>)")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root of the photo API; listing and search paths are appended to it.
    pub api_base_url: String,
    /// Client id sent with every request.
    pub access_key: AccessKey,
    /// Records requested per page.
    pub per_page: u32,
    /// Distance from the document bottom at which the next page is requested.
    pub scroll_threshold: f64,
    /// Minimum spacing between scroll-triggered loads.
    #[serde(with = "humantime_serde")]
    pub scroll_throttle: Duration,
    /// Directory backing the local key-value store (favorites live here).
    pub favorites_dir: PathBuf,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        // An empty document is a valid "all defaults" configuration.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("failed to parse YAML configuration")
    }

    /// Replace the configured access key when `key` is present and non-empty.
    pub fn with_access_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.access_key = AccessKey::new(key);
        }
        self
    }

    /// Apply [`ACCESS_KEY_ENV`] from the process environment.
    pub fn with_env_overrides(self) -> Self {
        let key = std::env::var(ACCESS_KEY_ENV).ok();
        self.with_access_key_override(key)
    }

    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.access_key.is_blank(),
            "access-key must be set (or provide {ACCESS_KEY_ENV})"
        );
        ensure!(
            !self.api_base_url.trim().is_empty(),
            "api-base-url must not be empty"
        );
        ensure!(self.per_page > 0, "per-page must be greater than zero");
        ensure!(
            self.scroll_threshold >= 0.0,
            "scroll-threshold must not be negative"
        );
        ensure!(
            !self.scroll_throttle.is_zero(),
            "scroll-throttle must be positive"
        );
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.unsplash.com".to_string(),
            access_key: AccessKey::default(),
            per_page: 10,
            scroll_threshold: 300.0,
            scroll_throttle: Duration::from_millis(300),
            favorites_dir: PathBuf::from(".latch"),
        }
    }
}
