use crate::event_builder::{EventDefaults, ReminderPolicy};
use crate::services::TaskFilter;
use crate::sync::SyncSettings;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub reminder: ReminderPolicy,
    #[serde(default)]
    pub todoist: TodoistConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub calendar_name: String,
    pub default_duration_minutes: u32,
    pub timezone: String,
    pub default_start_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoistConfig {
    pub project_id: Option<String>,
    pub label: Option<String>,
    pub exclude_recurring: bool,
    pub exclude_subtasks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            calendar_name: "Todoist Tasks".to_string(),
            default_duration_minutes: 30,
            timezone: "UTC".to_string(),
            default_start_time: "09:00".to_string(),
        }
    }
}

impl Default for TodoistConfig {
    fn default() -> Self {
        Self { project_id: None, label: None, exclude_recurring: true, exclude_subtasks: true }
    }
}

impl Config {
    /// Load from the default location, creating it with defaults if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(config_path)?;
            return Ok(default_config);
        }

        // Read and parse config file
        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Serialize and save config
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.sync
            .timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("Unknown timezone '{}' in [sync] timezone", self.sync.timezone))?;
        self.start_time()?;
        if self.sync.calendar_name.trim().is_empty() {
            return Err(anyhow!("[sync] calendar_name must not be empty"));
        }
        Ok(())
    }

    fn start_time(&self) -> Result<NaiveTime> {
        let raw = self.sync.default_start_time.as_str();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .with_context(|| format!("Invalid [sync] default_start_time '{}', expected HH:MM", raw))
    }

    /// Resolve the settings handed to the sync engine.
    pub fn sync_settings(&self) -> Result<SyncSettings> {
        self.validate()?;
        Ok(SyncSettings {
            calendar_name: self.sync.calendar_name.clone(),
            default_duration_minutes: self.sync.default_duration_minutes,
            filter: TaskFilter {
                exclude_recurring: self.todoist.exclude_recurring,
                exclude_subtasks: self.todoist.exclude_subtasks,
                project_id: self.todoist.project_id.clone(),
                label: self.todoist.label.clone(),
            },
            event_defaults: EventDefaults {
                timezone: self.sync.timezone.clone(),
                start_time: self.start_time()?,
                reminder: self.reminder.clone(),
            },
        })
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TODOSYNC_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    let proj_dirs = ProjectDirs::from("com", "ducktape", "todosync")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}
