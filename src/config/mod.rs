//! Configuration file: settings and named credential profiles

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::api::client::DEFAULT_API_BASE;

/// Upper bound for `settings.safety_margin_secs` (one day)
const MAX_SAFETY_MARGIN_SECS: u64 = 86_400;

/// Application configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Credential profiles keyed by name (`[profile.<name>]` tables)
    #[serde(default, rename = "profile")]
    pub profiles: BTreeMap<String, ProfileCredentials>,
}

/// Tool-wide settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub timeout_secs: u64,
    /// Treat cached tokens as expired this many seconds early
    pub safety_margin_secs: u64,
    /// Token cache directory (default: platform cache dir)
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 5,
            safety_margin_secs: 30,
            cache_dir: None,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn safety_margin(&self) -> chrono::Duration {
        let secs = self.safety_margin_secs.min(MAX_SAFETY_MARGIN_SECS) as i64;
        chrono::Duration::seconds(secs)
    }

    /// Configured cache directory, falling back to the platform cache dir.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let proj_dirs = ProjectDirs::from("com", "wecom-notify", "wecom-notify")
            .context("Could not determine cache directory; set settings.cache_dir")?;
        Ok(proj_dirs.cache_dir().to_path_buf())
    }
}

/// Credentials for one WeCom application
#[derive(Clone, Default, Deserialize)]
pub struct ProfileCredentials {
    #[serde(default, alias = "corpid")]
    pub corp_id: String,
    #[serde(default, alias = "corpsecret")]
    pub corp_secret: String,
    #[serde(default, alias = "agentid")]
    pub agent_id: i64,
}

impl ProfileCredentials {
    /// Both corp id and corp secret are set.
    pub fn is_complete(&self) -> bool {
        !self.corp_id.is_empty() && !self.corp_secret.is_empty()
    }
}

// Keep the secret out of logs and error output
impl fmt::Debug for ProfileCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileCredentials")
            .field("corp_id", &self.corp_id)
            .field("corp_secret", &"[redacted]")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.settings.safety_margin_secs > MAX_SAFETY_MARGIN_SECS {
            bail!(
                "settings.safety_margin_secs {} exceeds the maximum of {}",
                config.settings.safety_margin_secs,
                MAX_SAFETY_MARGIN_SECS
            );
        }
        Ok(config)
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&ProfileCredentials> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile),
            None => {
                let known: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
                if known.is_empty() {
                    bail!("Profile '{}' not found: config defines no profiles", name);
                }
                bail!(
                    "Profile '{}' not found (known profiles: {})",
                    name,
                    known.join(", ")
                );
            }
        }
    }
}
