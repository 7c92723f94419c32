//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Smart grouping (debounce) of audible alerts
//! - Repeat reminders for unread conversations
//! - The cadence of the background reminder scan
//!
//! Configuration is stored at `~/.config/nudge/config.toml`. Every field
//! has a default, so a missing file, section or key is never an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Which instant the repeat interval is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAnchor {
    /// Always measured from the start of the unread episode.
    EpisodeStart,
    /// Measured from the last reminder, or the episode start before the first one.
    LastReminder,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub smart_grouping_enabled: bool,
    #[serde(default = "default_grouping_timeout_minutes")]
    pub grouping_timeout_minutes: u32,
    #[serde(default = "default_true")]
    pub repeat_notifications_enabled: bool,
    #[serde(default = "default_repeat_interval_minutes")]
    pub repeat_interval_minutes: u32,
    #[serde(default = "default_max_repeats")]
    pub max_repeats: u32,
    #[serde(default = "default_escalation_anchor")]
    pub escalation_anchor: EscalationAnchor,
}

/// Background reminder scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scan_period_seconds")]
    pub scan_period_seconds: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/nudge/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_true() -> bool {
    true
}
fn default_grouping_timeout_minutes() -> u32 {
    3
}
fn default_repeat_interval_minutes() -> u32 {
    5
}
fn default_max_repeats() -> u32 {
    3
}
fn default_escalation_anchor() -> EscalationAnchor {
    EscalationAnchor::LastReminder
}
fn default_scan_period_seconds() -> u64 {
    60
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            smart_grouping_enabled: true,
            grouping_timeout_minutes: default_grouping_timeout_minutes(),
            repeat_notifications_enabled: true,
            repeat_interval_minutes: default_repeat_interval_minutes(),
            max_repeats: default_max_repeats(),
            escalation_anchor: default_escalation_anchor(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_period_seconds: default_scan_period_seconds(),
        }
    }
}

impl NotificationsConfig {
    pub fn grouping_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.grouping_timeout_minutes))
    }

    pub fn repeat_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.repeat_interval_minutes))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(format!("'{value}': {e}")))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|e| invalid(format!("'{value}': {e}")))?
                    .into(),
            ),
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (
                "notifications.repeat_interval_minutes",
                u64::from(self.notifications.repeat_interval_minutes),
            ),
            (
                "scheduler.scan_period_seconds",
                self.scheduler.scan_period_seconds,
            ),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Period of the background scan, never coarser than the repeat interval.
    pub fn scan_period(&self) -> Duration {
        let configured = Duration::from_secs(self.scheduler.scan_period_seconds.max(1));
        let interval =
            Duration::from_secs(u64::from(self.notifications.repeat_interval_minutes.max(1)) * 60);
        configured.min(interval)
    }

    /// Default configuration file location.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                tracing::info!(path = %path.display(), "initialized configuration with defaults");
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. On error `self` is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load from disk, returning defaults on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert!(cfg.notifications.smart_grouping_enabled);
        assert_eq!(cfg.notifications.grouping_timeout_minutes, 3);
        assert!(cfg.notifications.repeat_notifications_enabled);
        assert_eq!(cfg.notifications.repeat_interval_minutes, 5);
        assert_eq!(cfg.notifications.max_repeats, 3);
        assert_eq!(
            cfg.notifications.escalation_anchor,
            EscalationAnchor::LastReminder
        );
        assert_eq!(cfg.scheduler.scan_period_seconds, 60);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: Config = toml::from_str(
            "[notifications]
             max_repeats = 5",
        )
        .unwrap();
        assert_eq!(cfg.notifications.max_repeats, 5);
        assert_eq!(cfg.notifications.grouping_timeout_minutes, 3);
        assert_eq!(cfg.scheduler.scan_period_seconds, 60);

        let empty: Config = toml::from_str("").unwrap();
        assert_eq!(empty, Config::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(
            cfg.get("notifications.grouping_timeout_minutes").as_deref(),
            Some("3")
        );
        assert_eq!(
            cfg.get("notifications.escalation_anchor").as_deref(),
            Some("last_reminder")
        );
        assert!(cfg.get("notifications.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_bool_number_and_enum() {
        let mut cfg = Config::default();
        cfg.set("notifications.smart_grouping_enabled", "false").unwrap();
        cfg.set("notifications.max_repeats", "7").unwrap();
        cfg.set("notifications.escalation_anchor", "episode_start")
            .unwrap();
        assert!(!cfg.notifications.smart_grouping_enabled);
        assert_eq!(cfg.notifications.max_repeats, 7);
        assert_eq!(
            cfg.notifications.escalation_anchor,
            EscalationAnchor::EpisodeStart
        );
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("notifications.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
        assert!(cfg.set("nonexistent", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_values_without_mutating() {
        let mut cfg = Config::default();
        assert!(cfg
            .set("notifications.smart_grouping_enabled", "maybe")
            .is_err());
        assert!(cfg.set("notifications.max_repeats", "-1").is_err());
        assert!(cfg
            .set("notifications.escalation_anchor", "sometimes")
            .is_err());
        assert!(cfg.set("notifications.repeat_interval_minutes", "0").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn scan_period_is_clamped_to_repeat_interval() {
        let mut cfg = Config::default();
        assert_eq!(cfg.scan_period(), Duration::from_secs(60));

        cfg.scheduler.scan_period_seconds = 3600;
        assert_eq!(cfg.scan_period(), Duration::from_secs(5 * 60));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[notifications\nmax_repeats = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.set("notifications.grouping_timeout_minutes", "10")
            .unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.notifications.grouping_timeout_minutes, 10);
    }
}
