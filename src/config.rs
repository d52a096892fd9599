use crate::analysis::DEFAULT_TOP_SLOTS;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const TOP_SLOTS_VAR: &str = "NYNC_TOP_SLOTS";
pub const MEETING_MINUTES_VAR: &str = "NYNC_MEETING_MINUTES";
pub const CALENDAR_TITLE_VAR: &str = "NYNC_CALENDAR_TITLE";

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Ranked scenarios to keep. `0` keeps all 24.
    pub top_slots: usize,
    pub meeting_minutes: u32,
    pub calendar_title: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            top_slots: DEFAULT_TOP_SLOTS,
            meeting_minutes: 60,
            calendar_title: "Team Sync".to_string(),
        }
    }
}

impl AnalysisOptions {
    /// Defaults overridden by `NYNC_TOP_SLOTS`, `NYNC_MEETING_MINUTES` and
    /// `NYNC_CALENDAR_TITLE` when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Examples
    /// ```
    /// use nync_libs::config::{AnalysisOptions, ConfigError};
    ///
    /// let options = AnalysisOptions::from_lookup(|key| match key {
    ///     "NYNC_TOP_SLOTS" => Some("5".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(options.top_slots, 5);
    /// assert_eq!(options.meeting_minutes, 60);
    ///
    /// let broken = AnalysisOptions::from_lookup(|key| match key {
    ///     "NYNC_MEETING_MINUTES" => Some("an hour".to_string()),
    ///     _ => None,
    /// });
    /// assert!(matches!(broken, Err(ConfigError::InvalidValue { .. })));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = AnalysisOptions::default();

        if let Some(top_slots) = parse_var(&lookup, TOP_SLOTS_VAR)? {
            options.top_slots = top_slots;
        }
        if let Some(minutes) = parse_var(&lookup, MEETING_MINUTES_VAR)? {
            options.meeting_minutes = minutes;
        }
        if let Some(title) = lookup(CALENDAR_TITLE_VAR) {
            options.calendar_title = title;
        }

        Ok(options)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_keeps_defaults() {
        assert_eq!(
            AnalysisOptions::from_lookup(|_| None),
            Ok(AnalysisOptions::default())
        );
    }

    #[test]
    fn reads_every_variable() {
        let options = AnalysisOptions::from_lookup(|key| {
            let value = match key {
                TOP_SLOTS_VAR => Some(" 0 "),
                MEETING_MINUTES_VAR => Some("90"),
                CALENDAR_TITLE_VAR => Some("Retro"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap();

        assert_eq!(options.top_slots, 0);
        assert_eq!(options.meeting_minutes, 90);
        assert_eq!(options.calendar_title, "Retro");
    }

    #[test]
    fn rejects_negative_slots() {
        let result = AnalysisOptions::from_lookup(|key| {
            if key == TOP_SLOTS_VAR {
                Some("-1".to_string())
            } else {
                None
            }
        });

        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                key: TOP_SLOTS_VAR.to_string(),
                value: "-1".to_string(),
            })
        );
    }
}
