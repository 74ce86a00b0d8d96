//! Store configuration for quire
//!
//! Configuration lives in `quire.toml` next to the database file. It is loaded
//! once at startup and handed to [`crate::db::Store::open_with`].

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{QuireError, Result};

pub use types::{
    CoordinatorConfig, ExtractorConfig, JournalConfig, StoreConfig, TagPolicy, VersionPolicy,
};

pub const CONFIG_FILE: &str = "quire.toml";
pub const DB_FILE: &str = "quire.db";

impl StoreConfig {
    /// Load configuration from `dir/quire.toml`, falling back to defaults
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(StoreConfig::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: StoreConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded store configuration");
        Ok(config)
    }

    /// Save configuration to `dir/quire.toml`
    pub fn save(&self, dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuireError::invalid_value("configuration", e))?;
        fs::write(dir.join(CONFIG_FILE), content)?;
        Ok(())
    }
}

impl TagPolicy {
    /// Normalize a raw tag; `None` when nothing is left
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let tag = if self.trim { raw.trim() } else { raw };
        if tag.is_empty() {
            return None;
        }
        if self.case_sensitive {
            Some(tag.to_string())
        } else {
            Some(tag.to_lowercase())
        }
    }
}

impl VersionPolicy {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn forced_retention(&self) -> Duration {
        Duration::from_secs(self.forced_retention_days * 86_400)
    }
}

impl CoordinatorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Per-user default store directory
pub fn default_store_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("quire"))
}
