//! Application configuration management.
//!
//! Configuration is stored at `~/.config/edustats/config.json` and may be
//! overridden from the environment (`EDUSTATS_API_URL`, `EDUSTATS_ROLE`,
//! `EDUSTATS_TOKEN`). The token is never written to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::session::{Role, SessionContext};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "edustats";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Cached statistics older than this are flagged in the status bar.
pub const DEFAULT_STALE_MINUTES: i64 = 60;

pub const ENV_API_URL: &str = "EDUSTATS_API_URL";
pub const ENV_ROLE: &str = "EDUSTATS_ROLE";
pub const ENV_TOKEN: &str = "EDUSTATS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub role: Role,
    pub stale_after_minutes: i64,
    pub cache_dir: Option<PathBuf>,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            role: Role::default(),
            stale_after_minutes: DEFAULT_STALE_MINUTES,
            cache_dir: None,
            token: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root directory for the persistent cache.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::minutes(self.stale_after_minutes.max(0))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup. Empty values are ignored and
    /// an unknown role keeps the configured one.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(role) = lookup(ENV_ROLE) {
            match role.parse() {
                Ok(role) => self.role = role,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_ROLE),
            }
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = Some(token);
        }
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.role, self.token.clone())
    }
}
