//! Automatic backup schedule settings.
//!
//! Two recurring slots exist: a daily backup and a weekly backup (the weekly
//! one also runs the retention sweep). Settings are persisted as string
//! key/value pairs in an external store; see [`keys`].

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Keys under which schedule settings are persisted.
pub mod keys {
    pub const DAILY_ENABLED: &str = "auto_backup.daily.enabled";
    pub const DAILY_TIME: &str = "auto_backup.daily.time";
    pub const WEEKLY_ENABLED: &str = "auto_backup.weekly.enabled";
    pub const WEEKLY_DAY: &str = "auto_backup.weekly.day";
    pub const WEEKLY_TIME: &str = "auto_backup.weekly.time";
    pub const KEEP_DAYS: &str = "auto_backup.keep_days";
}

/// Longest accepted retention horizon (100 years).
pub const MAX_KEEP_DAYS: u32 = 36_500;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Wall-clock time of day (`HH:MM`, 24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> DomainResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(DomainError::validation(format!(
                "time of day out of range: {hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl core::str::FromStr for TimeOfDay {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("expected HH:MM, got `{s}`"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl core::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Which recurring job a firing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSlot {
    Daily,
    Weekly,
}

impl ScheduleSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleSlot::Daily => "daily",
            ScheduleSlot::Weekly => "weekly",
        }
    }
}

impl core::fmt::Display for ScheduleSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ScheduleSlot {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ScheduleSlot::Daily),
            "weekly" => Ok(ScheduleSlot::Weekly),
            other => Err(DomainError::validation(format!(
                "backup slot must be `daily` or `weekly`, got `{other}`"
            ))),
        }
    }
}

/// Persisted schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSettings {
    pub daily_enabled: bool,
    pub daily_time: TimeOfDay,
    pub weekly_enabled: bool,
    /// 0 = Sunday … 6 = Saturday.
    pub weekly_day: u8,
    pub weekly_time: TimeOfDay,
    /// Retention horizon applied after each weekly backup.
    pub keep_days: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            daily_enabled: false,
            daily_time: TimeOfDay { hour: 2, minute: 0 },
            weekly_enabled: false,
            weekly_day: 0,
            weekly_time: TimeOfDay { hour: 1, minute: 0 },
            keep_days: 30,
        }
    }
}

impl ScheduleSettings {
    /// Rebuild settings from persisted string values.
    ///
    /// Missing or unparseable values fall back to the defaults; booleans are
    /// true only for `"true"`.
    pub fn from_stored<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |v: Option<String>| v.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        Self {
            daily_enabled: flag(lookup(keys::DAILY_ENABLED)),
            daily_time: lookup(keys::DAILY_TIME)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.daily_time),
            weekly_enabled: flag(lookup(keys::WEEKLY_ENABLED)),
            weekly_day: lookup(keys::WEEKLY_DAY)
                .and_then(|v| v.trim().parse::<u8>().ok())
                .filter(|d| *d <= 6)
                .unwrap_or(defaults.weekly_day),
            weekly_time: lookup(keys::WEEKLY_TIME)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.weekly_time),
            keep_days: lookup(keys::KEEP_DAYS)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|d| (1..=MAX_KEEP_DAYS).contains(d))
                .unwrap_or(defaults.keep_days),
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.daily_enabled || self.weekly_enabled
    }

    pub fn is_enabled(&self, slot: ScheduleSlot) -> bool {
        match slot {
            ScheduleSlot::Daily => self.daily_enabled,
            ScheduleSlot::Weekly => self.weekly_enabled,
        }
    }

    /// Cron expression (seconds field first) for a slot.
    ///
    /// Daily `02:30` → `0 30 2 * * *`; weekly Sunday `01:00` → `0 0 1 * * Sun`.
    pub fn cron_expression(&self, slot: ScheduleSlot) -> String {
        match slot {
            ScheduleSlot::Daily => format!(
                "0 {} {} * * *",
                self.daily_time.minute(),
                self.daily_time.hour()
            ),
            ScheduleSlot::Weekly => format!(
                "0 {} {} * * {}",
                self.weekly_time.minute(),
                self.weekly_time.hour(),
                weekday_name(self.weekly_day)
            ),
        }
    }

    /// Human description of a slot, e.g. `daily at 02:00` or `weekly on Sun at 01:00`.
    pub fn describe(&self, slot: ScheduleSlot) -> String {
        match slot {
            ScheduleSlot::Daily => format!("daily at {}", self.daily_time),
            ScheduleSlot::Weekly => format!(
                "weekly on {} at {}",
                weekday_name(self.weekly_day),
                self.weekly_time
            ),
        }
    }
}

/// Short English weekday name; out-of-range days map to Sunday.
pub fn weekday_name(day: u8) -> &'static str {
    WEEKDAYS.get(day as usize).copied().unwrap_or(WEEKDAYS[0])
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub daily_enabled: Option<bool>,
    pub daily_time: Option<TimeOfDay>,
    pub weekly_enabled: Option<bool>,
    pub weekly_day: Option<u8>,
    pub weekly_time: Option<TimeOfDay>,
    pub keep_days: Option<u32>,
}

impl SettingsUpdate {
    /// Validate the provided fields.
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(day) = self.weekly_day {
            if day > 6 {
                return Err(DomainError::validation(format!(
                    "weekly day must be 0 (Sunday) to 6 (Saturday), got {day}"
                )));
            }
        }
        if let Some(days) = self.keep_days {
            if !(1..=MAX_KEEP_DAYS).contains(&days) {
                return Err(DomainError::validation(format!(
                    "keep days must be 1 to {MAX_KEEP_DAYS}, got {days}"
                )));
            }
        }
        Ok(())
    }

    /// Merge into `settings`, returning the merged value.
    pub fn apply_to(&self, settings: &ScheduleSettings) -> DomainResult<ScheduleSettings> {
        self.validate()?;
        let mut next = settings.clone();
        if let Some(v) = self.daily_enabled {
            next.daily_enabled = v;
        }
        if let Some(v) = self.daily_time {
            next.daily_time = v;
        }
        if let Some(v) = self.weekly_enabled {
            next.weekly_enabled = v;
        }
        if let Some(v) = self.weekly_day {
            next.weekly_day = v;
        }
        if let Some(v) = self.weekly_time {
            next.weekly_time = v;
        }
        if let Some(v) = self.keep_days {
            next.keep_days = v;
        }
        Ok(next)
    }

    /// `(key, value)` pairs for every provided field, in persisted form.
    pub fn stored_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.daily_enabled {
            pairs.push((keys::DAILY_ENABLED, v.to_string()));
        }
        if let Some(v) = self.daily_time {
            pairs.push((keys::DAILY_TIME, v.to_string()));
        }
        if let Some(v) = self.weekly_enabled {
            pairs.push((keys::WEEKLY_ENABLED, v.to_string()));
        }
        if let Some(v) = self.weekly_day {
            pairs.push((keys::WEEKLY_DAY, v.to_string()));
        }
        if let Some(v) = self.weekly_time {
            pairs.push((keys::WEEKLY_TIME, v.to_string()));
        }
        if let Some(v) = self.keep_days {
            pairs.push((keys::KEEP_DAYS, v.to_string()));
        }
        pairs
    }
}

/// Settings plus live scheduler state, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    #[serde(flatten)]
    pub settings: ScheduleSettings,
    pub is_enabled: bool,
    pub daily_job_running: bool,
    pub weekly_job_running: bool,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn time_of_day_parses_and_formats() {
        let t: TimeOfDay = "2:05".parse().unwrap();
        assert_eq!(t.to_string(), "02:05");
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn cron_expressions_follow_settings() {
        let settings = ScheduleSettings {
            daily_time: "02:30".parse().unwrap(),
            weekly_day: 3,
            weekly_time: "23:15".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(settings.cron_expression(ScheduleSlot::Daily), "0 30 2 * * *");
        assert_eq!(settings.cron_expression(ScheduleSlot::Weekly), "0 15 23 * * Wed");
    }

    #[test]
    fn stored_values_fall_back_to_defaults() {
        let mut stored = HashMap::new();
        stored.insert(keys::DAILY_ENABLED, "true".to_string());
        stored.insert(keys::DAILY_TIME, "garbage".to_string());
        stored.insert(keys::WEEKLY_DAY, "9".to_string());
        stored.insert(keys::KEEP_DAYS, "14".to_string());

        let settings = ScheduleSettings::from_stored(|k| stored.get(k).cloned());
        assert!(settings.daily_enabled);
        assert_eq!(settings.daily_time.to_string(), "02:00");
        assert!(!settings.weekly_enabled);
        assert_eq!(settings.weekly_day, 0);
        assert_eq!(settings.keep_days, 14);
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let update = SettingsUpdate {
            weekly_enabled: Some(true),
            weekly_time: Some("03:45".parse().unwrap()),
            ..Default::default()
        };
        let next = update.apply_to(&ScheduleSettings::default()).unwrap();
        assert!(next.weekly_enabled);
        assert_eq!(next.weekly_time.to_string(), "03:45");
        assert!(!next.daily_enabled);
        assert_eq!(
            update.stored_pairs(),
            vec![
                (keys::WEEKLY_ENABLED, "true".to_string()),
                (keys::WEEKLY_TIME, "03:45".to_string()),
            ]
        );
    }

    #[test]
    fn update_rejects_bad_values() {
        let bad_day = SettingsUpdate {
            weekly_day: Some(7),
            ..Default::default()
        };
        assert!(bad_day.apply_to(&ScheduleSettings::default()).is_err());

        let bad_keep = SettingsUpdate {
            keep_days: Some(0),
            ..Default::default()
        };
        assert!(bad_keep.validate().is_err());

        let huge_keep = SettingsUpdate {
            keep_days: Some(200_000_000),
            ..Default::default()
        };
        assert!(huge_keep.apply_to(&ScheduleSettings::default()).is_err());
        assert!(SettingsUpdate {
            keep_days: Some(MAX_KEEP_DAYS),
            ..Default::default()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn stored_keep_days_out_of_range_falls_back() {
        let settings = ScheduleSettings::from_stored(|k| {
            (k == keys::KEEP_DAYS).then(|| "200000000".to_string())
        });
        assert_eq!(settings.keep_days, 30);
    }

    #[test]
    fn snapshot_flattens_settings() {
        let snap = SettingsSnapshot {
            settings: ScheduleSettings::default(),
            is_enabled: false,
            daily_job_running: false,
            weekly_job_running: false,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["dailyTime"], "02:00");
        assert_eq!(json["keepDays"], 30);
        assert_eq!(json["isEnabled"], false);
    }
}
