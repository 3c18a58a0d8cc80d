//! Instance and schedule configuration model, defaults, and loading.

use std::collections::HashSet;
use std::path::Path;

/// Root configuration loaded from `config.toml`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Configured backend instances, each run independently.
    pub instances: Vec<InstanceConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Scheduling loop preferences.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between passes over all instances. Zero means run once and exit.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

/// One configured Sonarr or Radarr instance.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct InstanceConfig {
    /// Unique instance label. Also names the search history file.
    pub name: String,
    pub kind: BackendKind,
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub search_mode: SearchMode,
    #[serde(default = "default_true")]
    pub monitored_only: bool,
    /// Maximum number of items searched per run.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: usize,
    #[serde(default)]
    pub dry_run: bool,
    /// Minimum hours before the same item may be searched again. Zero
    /// disables search history tracking for this instance.
    #[serde(default)]
    pub search_frequency_hours: f64,
}

/// Supported backend API shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Sonarr,
    Radarr,
}

/// Which candidate classes an instance searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Missing,
    Upgrades,
    #[default]
    Both,
}

impl SearchMode {
    pub fn includes_missing(self) -> bool {
        matches!(self, SearchMode::Missing | SearchMode::Both)
    }

    pub fn includes_upgrades(self) -> bool {
        matches!(self, SearchMode::Upgrades | SearchMode::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Missing => "missing",
            SearchMode::Upgrades => "upgrades",
            SearchMode::Both => "both",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_search_limit() -> usize {
    10
}

fn default_rate_limit_per_minute() -> usize {
    5
}

fn default_interval_minutes() -> u64 {
    60
}

/// Reads, parses, and validates the configuration at `path`.
pub fn load_config(path: &Path) -> Result<Config, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config file {}: {}", path.display(), err))?;
    let config: Config = toml::from_str(&raw)
        .map_err(|err| format!("failed to parse config file {}: {}", path.display(), err))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), String> {
    if config.instances.is_empty() {
        return Err("config must contain at least one instance".to_string());
    }
    let mut seen_names = HashSet::new();
    for (index, instance) in config.instances.iter().enumerate() {
        if instance.name.trim().is_empty() {
            return Err(format!("instance {} has an empty 'name'", index));
        }
        if instance.url.trim().is_empty() {
            return Err(format!("instance '{}' has an empty 'url'", instance.name));
        }
        if instance.api_key.trim().is_empty() {
            return Err(format!("instance '{}' has an empty 'api_key'", instance.name));
        }
        // Search history files are keyed by instance name and must never be
        // shared between instances.
        if !seen_names.insert(instance.name.as_str()) {
            return Err(format!("duplicate instance name '{}'", instance.name));
        }
    }
    Ok(())
}
