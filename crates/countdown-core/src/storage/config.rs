//! TOML-based timer settings.
//!
//! Stores:
//! - Voice announcement interval
//! - Beep interval and the final window in which beeps sound
//! - Completion melody file
//! - Restore-on-start flag and the last entered time fields
//!
//! Settings are stored at `~/.config/countdown/settings.toml`. A file that
//! cannot be parsed, or a field with a bad value, never stops the timer: the
//! affected values fall back to defaults and a warning is recorded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::data_dir;
use crate::duration::{check_field, EntryMode, TargetDuration};
use crate::error::ConfigError;

/// Values the countdown engine reads. Copied into the engine at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfiguration {
    pub voice_interval_seconds: u64,
    pub beep_interval_seconds: u64,
    pub final_window_seconds: u64,
    pub completion_melody_path: String,
}

impl Default for TimerConfiguration {
    fn default() -> Self {
        Settings::default().timer_configuration()
    }
}

/// Persisted settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_voice_interval")]
    pub voice_interval: u64,
    #[serde(default = "default_beep_interval")]
    pub beep_interval: u64,
    #[serde(default = "default_final_beep_window")]
    pub final_beep_window: u64,
    #[serde(default = "default_melody_file")]
    pub melody_file: String,
    #[serde(default)]
    pub restore_time: bool,
    #[serde(default)]
    pub hm_h: String,
    #[serde(default)]
    pub hm_m: String,
    #[serde(default)]
    pub ms_m: String,
    #[serde(default)]
    pub ms_s: String,
}

fn default_voice_interval() -> u64 {
    10
}
fn default_beep_interval() -> u64 {
    2
}
fn default_final_beep_window() -> u64 {
    10
}
fn default_melody_file() -> String {
    "example.mp3".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice_interval: default_voice_interval(),
            beep_interval: default_beep_interval(),
            final_beep_window: default_final_beep_window(),
            melody_file: default_melody_file(),
            restore_time: false,
            hm_h: String::new(),
            hm_m: String::new(),
            ms_m: String::new(),
            ms_s: String::new(),
        }
    }
}

/// Type of value a setting holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    /// Integer that must be at least 1.
    Interval,
    /// Integer, zero allowed.
    Count,
    Text,
    Flag,
}

/// Every key the settings file knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    VoiceInterval,
    BeepInterval,
    FinalBeepWindow,
    MelodyFile,
    RestoreTime,
    HourMinuteHours,
    HourMinuteMinutes,
    MinuteSecondMinutes,
    MinuteSecondSeconds,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::VoiceInterval,
        SettingKey::BeepInterval,
        SettingKey::FinalBeepWindow,
        SettingKey::MelodyFile,
        SettingKey::RestoreTime,
        SettingKey::HourMinuteHours,
        SettingKey::HourMinuteMinutes,
        SettingKey::MinuteSecondMinutes,
        SettingKey::MinuteSecondSeconds,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::VoiceInterval => "voice_interval",
            SettingKey::BeepInterval => "beep_interval",
            SettingKey::FinalBeepWindow => "final_beep_window",
            SettingKey::MelodyFile => "melody_file",
            SettingKey::RestoreTime => "restore_time",
            SettingKey::HourMinuteHours => "hm_h",
            SettingKey::HourMinuteMinutes => "hm_m",
            SettingKey::MinuteSecondMinutes => "ms_m",
            SettingKey::MinuteSecondSeconds => "ms_s",
        }
    }

    /// The duration field a remembered-entry key holds: its mode and whether
    /// it is the first field.
    pub fn entry_field(self) -> Option<(EntryMode, bool)> {
        match self {
            SettingKey::HourMinuteHours => Some((EntryMode::HourMinute, true)),
            SettingKey::HourMinuteMinutes => Some((EntryMode::HourMinute, false)),
            SettingKey::MinuteSecondMinutes => Some((EntryMode::MinuteSecond, true)),
            SettingKey::MinuteSecondSeconds => Some((EntryMode::MinuteSecond, false)),
            _ => None,
        }
    }

    pub fn setting_type(self) -> SettingType {
        match self {
            SettingKey::VoiceInterval | SettingKey::BeepInterval => SettingType::Interval,
            SettingKey::FinalBeepWindow => SettingType::Count,
            SettingKey::RestoreTime => SettingType::Flag,
            _ => SettingType::Text,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl Settings {
    pub fn timer_configuration(&self) -> TimerConfiguration {
        TimerConfiguration {
            voice_interval_seconds: self.voice_interval,
            beep_interval_seconds: self.beep_interval,
            final_window_seconds: self.final_beep_window,
            completion_melody_path: self.melody_file.clone(),
        }
    }

    /// Get a setting rendered as a string.
    pub fn get(&self, key: SettingKey) -> String {
        match key {
            SettingKey::VoiceInterval => self.voice_interval.to_string(),
            SettingKey::BeepInterval => self.beep_interval.to_string(),
            SettingKey::FinalBeepWindow => self.final_beep_window.to_string(),
            SettingKey::MelodyFile => self.melody_file.clone(),
            SettingKey::RestoreTime => self.restore_time.to_string(),
            SettingKey::HourMinuteHours => self.hm_h.clone(),
            SettingKey::HourMinuteMinutes => self.hm_m.clone(),
            SettingKey::MinuteSecondMinutes => self.ms_m.clone(),
            SettingKey::MinuteSecondSeconds => self.ms_s.clone(),
        }
    }

    /// Set a setting from text. The value must parse as the key's type.
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.name().to_string(),
            message,
        };
        match key.setting_type() {
            SettingType::Interval | SettingType::Count => {
                let n: u64 = value
                    .trim()
                    .parse()
                    .map_err(|e| invalid(format!("'{value}' is not a number: {e}")))?;
                self.set_number(key, n).map_err(invalid)
            }
            SettingType::Flag => {
                let flag: bool = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("'{value}' is not true or false")))?;
                self.restore_time = flag;
                Ok(())
            }
            SettingType::Text => self.set_text(key, value.to_string()).map_err(invalid),
        }
    }

    fn set_number(&mut self, key: SettingKey, n: u64) -> Result<(), String> {
        if key.setting_type() == SettingType::Interval && n == 0 {
            return Err("interval must be at least 1 second".into());
        }
        match key {
            SettingKey::VoiceInterval => self.voice_interval = n,
            SettingKey::BeepInterval => self.beep_interval = n,
            SettingKey::FinalBeepWindow => self.final_beep_window = n,
            other => return Err(format!("{other} is not numeric")),
        }
        Ok(())
    }

    fn set_text(&mut self, key: SettingKey, value: String) -> Result<(), String> {
        if let Some((mode, first)) = key.entry_field() {
            check_field(mode, first, &value).map_err(|e| e.to_string())?;
        }
        match key {
            SettingKey::MelodyFile => self.melody_file = value,
            SettingKey::HourMinuteHours => self.hm_h = value,
            SettingKey::HourMinuteMinutes => self.hm_m = value,
            SettingKey::MinuteSecondMinutes => self.ms_m = value,
            SettingKey::MinuteSecondSeconds => self.ms_s = value,
            other => return Err(format!("{other} is not text")),
        }
        Ok(())
    }

    /// Parse a settings file, replacing anything invalid with defaults.
    /// Returns the settings and one warning per replaced value or ignored key.
    pub fn from_toml_lenient(content: &str) -> (Self, Vec<ConfigError>) {
        let mut settings = Settings::default();
        let mut warnings = Vec::new();

        let table: toml::Table = match toml::from_str(content) {
            Ok(table) => table,
            Err(e) => {
                warnings.push(ConfigError::ParseFailed(e.to_string()));
                return (settings, warnings);
            }
        };

        for (name, value) in &table {
            let key = match name.parse::<SettingKey>() {
                Ok(key) => key,
                Err(e) => {
                    warnings.push(e);
                    continue;
                }
            };
            if let Err(message) = settings.apply_toml(key, value) {
                warnings.push(ConfigError::InvalidValue {
                    key: key.name().to_string(),
                    message: format!("{message}, using default '{}'", settings.get(key)),
                });
            }
        }

        (settings, warnings)
    }

    fn apply_toml(&mut self, key: SettingKey, value: &toml::Value) -> Result<(), String> {
        match (key.setting_type(), value) {
            (SettingType::Interval | SettingType::Count, toml::Value::Integer(n)) => {
                let n = u64::try_from(*n).map_err(|_| format!("{n} is negative"))?;
                self.set_number(key, n)
            }
            (SettingType::Flag, toml::Value::Boolean(flag)) => {
                self.restore_time = *flag;
                Ok(())
            }
            (SettingType::Text, toml::Value::String(text)) => self.set_text(key, text.clone()),
            (_, other) => Err(format!("unexpected {}", other.type_str())),
        }
    }

    /// Remember the fields the user entered, clearing the other mode's.
    pub fn remember_entry(&mut self, entry: &TargetDuration) {
        let (first, second) = entry.fields();
        match entry.mode() {
            EntryMode::HourMinute => {
                self.hm_h = first;
                self.hm_m = second;
                self.ms_m.clear();
                self.ms_s.clear();
            }
            EntryMode::MinuteSecond => {
                self.ms_m = first;
                self.ms_s = second;
                self.hm_h.clear();
                self.hm_m.clear();
            }
        }
    }

    /// The last entered duration, if restore-on-start is enabled and the
    /// remembered fields are still valid. Minutes:seconds wins when both
    /// modes have values.
    pub fn restored_entry(&self) -> Option<TargetDuration> {
        if !self.restore_time {
            return None;
        }
        let (mode, first, second) = if !self.ms_m.is_empty() || !self.ms_s.is_empty() {
            (EntryMode::MinuteSecond, &self.ms_m, &self.ms_s)
        } else if !self.hm_h.is_empty() || !self.hm_m.is_empty() {
            (EntryMode::HourMinute, &self.hm_h, &self.hm_m)
        } else {
            return None;
        };
        match TargetDuration::from_fields(mode, first, second) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, ?mode, "remembered time is invalid, not restoring it");
                None
            }
        }
    }
}

/// Settings bound to a file. Every successful `put` is written through.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
    warnings: Vec<ConfigError>,
}

impl SettingsStore {
    /// `<data dir>/settings.toml`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("settings.toml"))
    }

    /// Load settings from `path`. A missing file is not an error; an
    /// unreadable or malformed one yields defaults plus warnings.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (settings, warnings) = match std::fs::read_to_string(&path) {
            Ok(content) => Settings::from_toml_lenient(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Settings::default(), Vec::new()),
            Err(e) => (
                Settings::default(),
                vec![ConfigError::LoadFailed {
                    path: path.clone(),
                    message: e.to_string(),
                }],
            ),
        };
        for warning in &warnings {
            tracing::warn!(path = %path.display(), "{warning}; falling back to defaults");
        }
        Self {
            path,
            settings,
            warnings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Problems found while loading.
    pub fn warnings(&self) -> &[ConfigError] {
        &self.warnings
    }

    pub fn timer_configuration(&self) -> TimerConfiguration {
        self.settings.timer_configuration()
    }

    /// Get a setting by name.
    ///
    /// # Errors
    /// Returns `UnknownKey` for names the settings file does not define.
    pub fn get(&self, name: &str) -> Result<String, ConfigError> {
        Ok(self.settings.get(name.parse()?))
    }

    /// Set a setting by name and persist.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value does not fit the
    /// key's type, or the file cannot be written.
    pub fn put(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let key: SettingKey = name.parse()?;
        self.settings.set(key, value)?;
        tracing::debug!(%key, value, "setting updated");
        self.save()
    }

    pub fn remember_entry(&mut self, entry: &TargetDuration) -> Result<(), ConfigError> {
        self.settings.remember_entry(entry);
        self.save()
    }

    pub fn restored_entry(&self) -> Option<TargetDuration> {
        self.settings.restored_entry()
    }

    /// Replace everything with defaults and persist.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: self.path.clone(),
            message,
        };
        let content = toml::to_string_pretty(&self.settings).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| save_failed(e.to_string()))
    }
}
