use crate::post::Locale;
use crate::timeline::DEFAULT_LOAD_THRESHOLD;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INSTANCE_URL: &str = "https://miao.social";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instance_url: String,
    pub locale: Locale,
    /// Lines from the end of the timeline at which the next page is requested
    pub load_threshold: usize,
    pub request_timeout_secs: u64,
    /// How long an error notification stays up unless dismissed
    pub notification_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_url: DEFAULT_INSTANCE_URL.to_string(),
            locale: Locale::default(),
            load_threshold: DEFAULT_LOAD_THRESHOLD,
            request_timeout_secs: 20,
            notification_secs: 8,
            log_file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("timelinetui").join("config.toml"))
    }

    /// Read the config file at `path`, or at the default location when no
    /// path is given. A missing default file yields the built-in defaults;
    /// a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.instance_url.trim().is_empty() {
            anyhow::bail!("instance_url must not be empty");
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.clone().or_else(|| {
            dirs::state_dir()
                .or_else(dirs::cache_dir)
                .map(|dir| dir.join("timelinetui").join("timelinetui.log"))
        })
    }
}
