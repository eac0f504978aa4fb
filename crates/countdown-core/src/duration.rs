//! Target duration as the user enters it.
//!
//! Two entry modes exist: hours and minutes (`H:MM`, hour 0-23) or minutes
//! and seconds (`MM:SS`). The mode also decides how the remaining time is
//! drawn on the clock.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::DurationError;
use crate::format::{seconds_to_hms, SECONDS_IN_HOUR, SECONDS_IN_MINUTE};

const MAX_HOUR: u64 = 23;
const MAX_MINUTE_OR_SECOND: u64 = 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    HourMinute,
    MinuteSecond,
}

impl EntryMode {
    fn pattern(self) -> &'static str {
        match self {
            EntryMode::HourMinute => "H:MM",
            EntryMode::MinuteSecond => "MM:SS",
        }
    }

    fn field_names(self) -> (&'static str, &'static str) {
        match self {
            EntryMode::HourMinute => ("hours", "minutes"),
            EntryMode::MinuteSecond => ("minutes", "seconds"),
        }
    }

    fn first_max(self) -> u64 {
        match self {
            EntryMode::HourMinute => MAX_HOUR,
            EntryMode::MinuteSecond => MAX_MINUTE_OR_SECOND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDuration {
    mode: EntryMode,
    first: u64,
    second: u64,
}

impl TargetDuration {
    pub fn hour_minute(hours: u64, minutes: u64) -> Result<Self, DurationError> {
        Self::new(EntryMode::HourMinute, hours, minutes)
    }

    pub fn minute_second(minutes: u64, seconds: u64) -> Result<Self, DurationError> {
        Self::new(EntryMode::MinuteSecond, minutes, seconds)
    }

    fn new(mode: EntryMode, first: u64, second: u64) -> Result<Self, DurationError> {
        let (first_name, second_name) = mode.field_names();
        check_range(first_name, first, mode.first_max())?;
        check_range(second_name, second, MAX_MINUTE_OR_SECOND)?;
        if first == 0 && second == 0 {
            return Err(DurationError::Zero);
        }
        Ok(Self {
            mode,
            first,
            second,
        })
    }

    /// Build from two text fields; an empty field counts as zero.
    pub fn from_fields(mode: EntryMode, first: &str, second: &str) -> Result<Self, DurationError> {
        let first = parse_field(mode, first)?;
        let second = parse_field(mode, second)?;
        Self::new(mode, first, second)
    }

    /// Parse `"A:B"` or a lone `"A"`.
    pub fn parse(mode: EntryMode, input: &str) -> Result<Self, DurationError> {
        let input = input.trim();
        match input.split_once(':') {
            Some((first, second)) => Self::from_fields(mode, first, second),
            None => Self::from_fields(mode, input, ""),
        }
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn total_seconds(&self) -> u64 {
        match self.mode {
            EntryMode::HourMinute => self.first * SECONDS_IN_HOUR + self.second * SECONDS_IN_MINUTE,
            EntryMode::MinuteSecond => self.first * SECONDS_IN_MINUTE + self.second,
        }
    }

    /// Field texts as they are remembered in the settings file.
    pub fn fields(&self) -> (String, String) {
        match self.mode {
            EntryMode::HourMinute => (self.first.to_string(), format!("{:02}", self.second)),
            EntryMode::MinuteSecond => (format!("{:02}", self.first), format!("{:02}", self.second)),
        }
    }

    /// Clock text for the remaining time in this entry's mode:
    /// `HH:MM : SS` or `MM:SS`.
    pub fn render(&self, remaining: u64) -> String {
        render_clock(self.mode, remaining)
    }

    /// Wall-clock moment the countdown ends if started at `start`.
    pub fn finishes_at<Tz: TimeZone>(&self, start: DateTime<Tz>) -> DateTime<Tz> {
        start + chrono::Duration::seconds(self.total_seconds() as i64)
    }
}

pub fn render_clock(mode: EntryMode, remaining: u64) -> String {
    match mode {
        EntryMode::HourMinute => {
            let (hours, minutes, seconds) = seconds_to_hms(remaining);
            format!("{hours:02}:{minutes:02} : {seconds:02}")
        }
        EntryMode::MinuteSecond => {
            let minutes = remaining / SECONDS_IN_MINUTE;
            let seconds = remaining % SECONDS_IN_MINUTE;
            format!("{minutes:02}:{seconds:02}")
        }
    }
}

/// Validate one remembered field on its own: digits only and within range.
/// An empty field is valid.
pub fn check_field(mode: EntryMode, first: bool, text: &str) -> Result<(), DurationError> {
    let value = parse_field(mode, text)?;
    let (first_name, second_name) = mode.field_names();
    if first {
        check_range(first_name, value, mode.first_max())
    } else {
        check_range(second_name, value, MAX_MINUTE_OR_SECOND)
    }
}

fn parse_field(mode: EntryMode, text: &str) -> Result<u64, DurationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    if text.len() > 2 || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(DurationError::Malformed {
            input: text.to_string(),
            expected: mode.pattern(),
        });
    }
    text.parse().map_err(|_| DurationError::Malformed {
        input: text.to_string(),
        expected: mode.pattern(),
    })
}

fn check_range(field: &'static str, value: u64, max: u64) -> Result<(), DurationError> {
    if value > max {
        return Err(DurationError::OutOfRange {
            field,
            value,
            min: 0,
            max,
        });
    }
    Ok(())
}
