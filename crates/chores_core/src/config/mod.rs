use crate::error::AppError;
use crate::reminder::ReminderPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "CHORES_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reminder_interval_minutes: u64,
    pub reset_hour: u8,
    pub reset_minute: u8,
    pub reminder_policy: PolicyName,
    pub before_midnight_slots: u8,
    pub max_concurrent_updates: usize,
    pub group: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminder_interval_minutes: 15,
            reset_hour: 0,
            reset_minute: 5,
            reminder_policy: PolicyName::Cooldown,
            before_midnight_slots: 3,
            max_concurrent_updates: 8,
            group: None,
        }
    }
}

impl Config {
    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_minutes.max(1) * 60)
    }

    pub fn reminder_policy(&self) -> ReminderPolicy {
        match self.reminder_policy {
            PolicyName::Cooldown => ReminderPolicy::Cooldown,
            PolicyName::BeforeMidnight => ReminderPolicy::BeforeMidnight {
                slots: self.before_midnight_slots.clamp(1, 24),
            },
        }
    }

    pub fn concurrency(&self) -> usize {
        self.max_concurrent_updates.max(1)
    }

    fn validate(self) -> Result<Self, AppError> {
        if self.reset_hour > 23 {
            return Err(AppError::invalid_data("reset_hour must be between 0 and 23"));
        }
        if self.reset_minute > 59 {
            return Err(AppError::invalid_data(
                "reset_minute must be between 0 and 59",
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    #[default]
    Cooldown,
    BeforeMidnight,
}

impl std::str::FromStr for PolicyName {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match canonical_key(raw).as_deref() {
            Some("cooldown" | "interval") => Ok(Self::Cooldown),
            Some("before_midnight" | "midnight") => Ok(Self::BeforeMidnight),
            _ => Err(AppError::invalid_input(format!(
                "unknown reminder policy '{}'",
                raw.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("chores").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("chores")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config() -> Result<Config, AppError> {
    let path = config_path()?;
    load_config_from_path(&path)
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.validate()
}

/// Apply a single `KEY=VALUE` override on top of `base`.
pub fn apply_override(base: &Config, raw: &str) -> Result<Config, AppError> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| AppError::invalid_input("override must be in KEY=VALUE format"))?;
    let key = canonical_key(key_raw)
        .ok_or_else(|| AppError::invalid_input("override key cannot be empty"))?;
    let value = value_raw.trim();

    let mut merged = base.clone();
    match key.as_str() {
        "reminder_interval_minutes" | "reminder_interval" => {
            merged.reminder_interval_minutes = parse_number(&key, value)?;
        }
        "reset_hour" => merged.reset_hour = parse_number(&key, value)?,
        "reset_minute" => merged.reset_minute = parse_number(&key, value)?,
        "reminder_policy" | "policy" => merged.reminder_policy = value.parse()?,
        "before_midnight_slots" | "slots" => {
            merged.before_midnight_slots = parse_number(&key, value)?;
        }
        "max_concurrent_updates" | "concurrency" => {
            merged.max_concurrent_updates = parse_number(&key, value)?;
        }
        "group" => {
            merged.group = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        other => {
            return Err(AppError::invalid_input(format!(
                "unknown config field '{other}'"
            )));
        }
    }

    merged.validate()
}

pub fn apply_overrides<'a, I>(base: &Config, overrides: I) -> Result<Config, AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    overrides
        .into_iter()
        .try_fold(base.clone(), |config, raw| apply_override(&config, raw))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::invalid_input(format!("{key} expects a number, got '{value}'")))
}

fn canonical_key(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
