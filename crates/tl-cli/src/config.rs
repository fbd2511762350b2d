//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tl_core::{CategoryEntry, CategoryTable, TrackerConfig};

/// Default period of the scheduled retention sweep.
const DEFAULT_SWEEP_INTERVAL_HOURS: u64 = 24;

/// A century of day buckets.
const MAX_RETENTION_DAYS: u32 = 36_500;

/// One sweep a year at the least.
const MAX_SWEEP_INTERVAL_HOURS: u64 = 24 * 365;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Session tracker tunables.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Hours between scheduled retention sweeps in `tl run`.
    #[serde(default = "default_sweep_interval_hours")]
    pub sweep_interval_hours: u64,

    /// Extra classification entries, consulted before the built-in table.
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
}

const fn default_sweep_interval_hours() -> u64 {
    DEFAULT_SWEEP_INTERVAL_HOURS
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("tracker", &self.tracker)
            .field("sweep_interval_hours", &self.sweep_interval_hours)
            .field("categories", &self.categories.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("timelens.db"),
            tracker: TrackerConfig::default(),
            sweep_interval_hours: DEFAULT_SWEEP_INTERVAL_HOURS,
            categories: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TL_*, nested keys with "__")
        figment = figment.merge(Env::prefixed("TL_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects tunables the tracker cannot work with.
    fn validate(&self) -> Result<(), String> {
        let threshold = self.tracker.significance_threshold_ms;
        if threshold < 0 {
            return Err(format!(
                "tracker.significance_threshold_ms must not be negative, got {threshold}"
            ));
        }
        let retention = self.tracker.retention_days;
        if !(1..=MAX_RETENTION_DAYS).contains(&retention) {
            return Err(format!(
                "tracker.retention_days must be between 1 and {MAX_RETENTION_DAYS}, got {retention}"
            ));
        }
        let hours = self.sweep_interval_hours;
        if !(1..=MAX_SWEEP_INTERVAL_HOURS).contains(&hours) {
            return Err(format!(
                "sweep_interval_hours must be between 1 and {MAX_SWEEP_INTERVAL_HOURS}, got {hours}"
            ));
        }
        Ok(())
    }

    /// The classification table: configured entries first, then the built-in table.
    pub fn category_table(&self) -> CategoryTable {
        if self.categories.is_empty() {
            CategoryTable::builtin().clone()
        } else {
            CategoryTable::with_overrides(self.categories.iter().cloned())
        }
    }
}

/// Returns the platform-specific config directory for TimeLens.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("timelens"))
}

/// Returns the platform-specific data directory for TimeLens.
///
/// On Linux: `~/.local/share/timelens`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("timelens"))
}
