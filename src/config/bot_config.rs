use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BotError, Result};

/// When the weekly auto-post fires
#[derive(Debug, Clone, PartialEq)]
pub struct AutopostSchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub timezone: Tz,
}

impl Default for AutopostSchedule {
    fn default() -> Self {
        Self {
            weekday: Weekday::Tue,
            time: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or_default(),
            timezone: chrono_tz::America::New_York,
        }
    }
}

/// Runtime configuration, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// JSON document holding every guild's settings
    pub settings_path: PathBuf,
    /// Maximum simultaneous upstream calls
    pub gate_permits: usize,
    /// Deadline for a single upstream call
    pub gate_timeout: Duration,
    /// Number of recap worker loops
    pub recap_workers: usize,
    /// Inactivity timeout of a week navigator
    pub navigator_timeout: Duration,
    pub autopost: AutopostSchedule,
    /// Base URL of the ESPN fantasy football API
    pub espn_base_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("state/guild_settings.json"),
            gate_permits: 2,
            gate_timeout: Duration::from_secs(25),
            recap_workers: 1,
            navigator_timeout: Duration::from_secs(300),
            autopost: AutopostSchedule::default(),
            espn_base_url: crate::upstream::espn::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settings_path = lookup("SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.settings_path);

        let gate_permits = parse_positive(&lookup, "GATE_PERMITS", defaults.gate_permits)?;
        let gate_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "GATE_TIMEOUT_SECS",
            defaults.gate_timeout.as_secs() as usize,
        )? as u64);
        let recap_workers = parse_positive(&lookup, "RECAP_WORKERS", defaults.recap_workers)?;
        let navigator_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "NAVIGATOR_TIMEOUT_SECS",
            defaults.navigator_timeout.as_secs() as usize,
        )? as u64);

        let weekday = match lookup("AUTOPOST_WEEKDAY") {
            Some(s) => s.trim().parse::<Weekday>().map_err(|_| BotError::Config {
                message: format!("AUTOPOST_WEEKDAY '{}' is not a weekday", s),
            })?,
            None => defaults.autopost.weekday,
        };
        let time = match lookup("AUTOPOST_TIME") {
            Some(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| BotError::Config {
                message: format!("AUTOPOST_TIME '{}' must be HH:MM: {}", s, e),
            })?,
            None => defaults.autopost.time,
        };
        let timezone = match lookup("AUTOPOST_TIMEZONE") {
            Some(s) => s.trim().parse::<Tz>().map_err(|e| BotError::Config {
                message: format!("AUTOPOST_TIMEZONE '{}' is not an IANA timezone: {}", s, e),
            })?,
            None => defaults.autopost.timezone,
        };

        let espn_base_url = lookup("ESPN_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.espn_base_url);

        Ok(Self {
            settings_path,
            gate_permits,
            gate_timeout,
            recap_workers,
            navigator_timeout,
            autopost: AutopostSchedule {
                weekday,
                time,
                timezone,
            },
            espn_base_url,
        })
    }
}

fn parse_positive<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(BotError::Config {
                message: format!("{} must be a positive integer, got '{}'", key, raw),
            }),
            Ok(v) => Ok(v),
        },
    }
}
