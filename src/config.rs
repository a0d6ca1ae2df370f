//! Support for configuration options
//!
//! Settings are read once at startup from the environment (and an optional `.env` file),
//! validated, and then passed around explicitly.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use chrono_tz::Tz;
use url::Url;

use crate::error::{Error, Result};
use crate::ical::EventBuilder;
use crate::reconciler::SyncSettings;

/// Part of the ProdID string that describes the organization (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
pub const ORG_NAME: &str = "Untis CalDAV Sync";
/// Client name announced to the timetable server when logging in
pub const CLIENT_NAME: &str = "untis-caldav-sync";
/// Prefix of the UIDs of every event this crate creates. Only events carrying it are ever deleted.
pub const UID_NAMESPACE: &str = "untis";

pub const DEFAULT_CALENDAR_NAME: &str = "Stundenplan";
pub const DEFAULT_CALDAV_URL: &str = "https://caldav.icloud.com/";
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
pub const DEFAULT_DAYS_PAST: u32 = 1;
pub const DEFAULT_DAYS_AHEAD: u32 = 35;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FAILURE_RATIO: f64 = 0.5;

const REQUIRED: [&str; 6] = [
    "UNTIS_SERVER",
    "UNTIS_SCHOOL",
    "UNTIS_USER",
    "UNTIS_PASS",
    "ICLOUD_USER",
    "ICLOUD_PASS",
];

/// How to reach the timetable server
#[derive(Clone)]
pub struct UntisSettings {
    pub server: String,
    pub school: String,
    pub username: String,
    pub password: String,
}

/// How to reach the calendar server
#[derive(Clone)]
pub struct CalDavSettings {
    pub url: Url,
    pub username: String,
    pub password: String,
    /// Display name of the calendar lessons are mirrored into
    pub calendar_name: String,
}

/// Everything a run needs to know
#[derive(Clone)]
pub struct Config {
    pub untis: UntisSettings,
    pub caldav: CalDavSettings,
    pub days_past: u32,
    pub days_ahead: u32,
    pub delete_missing: bool,
    pub mark_cancelled: bool,
    pub timezone: Tz,
    pub http_timeout: Duration,
    pub max_failure_ratio: f64,
}

impl Config {
    /// Load the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first, if there is one.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if err.not_found() == false {
                log::warn!("Unable to load the .env file: {}", err);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build and validate a configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| value.trim().is_empty() == false);

        let missing: Vec<&'static str> = REQUIRED.iter()
            .copied()
            .filter(|name| get(name).is_none())
            .collect();
        if missing.is_empty() == false {
            return Err(Error::MissingSettings(missing));
        }
        let required = |name: &str| get(name).unwrap_or_default();

        let caldav_url = match get("CALDAV_URL") {
            None => DEFAULT_CALDAV_URL.to_string(),
            Some(url) => url,
        };
        let caldav_url = Url::parse(&caldav_url).map_err(|err| Error::InvalidSetting {
            name: "CALDAV_URL",
            value: caldav_url.clone(),
            reason: err.to_string(),
        })?;

        let timezone = match get("TIMEZONE") {
            None => DEFAULT_TIMEZONE.parse::<Tz>().map_err(|err| Error::InvalidSetting {
                name: "TIMEZONE", value: DEFAULT_TIMEZONE.to_string(), reason: err.to_string(),
            })?,
            Some(value) => value.parse::<Tz>().map_err(|err| Error::InvalidSetting {
                name: "TIMEZONE", value: value.clone(), reason: err.to_string(),
            })?,
        };

        let http_timeout_secs = parse_number("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), DEFAULT_HTTP_TIMEOUT_SECS)?;
        if http_timeout_secs == 0 {
            return Err(Error::InvalidSetting {
                name: "HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        let max_failure_ratio = parse_number("MAX_FAILURE_RATIO", get("MAX_FAILURE_RATIO"), DEFAULT_MAX_FAILURE_RATIO)?;
        if (0.0..=1.0).contains(&max_failure_ratio) == false {
            return Err(Error::InvalidSetting {
                name: "MAX_FAILURE_RATIO",
                value: max_failure_ratio.to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }

        Ok(Self {
            untis: UntisSettings {
                server: required("UNTIS_SERVER"),
                school: required("UNTIS_SCHOOL"),
                username: required("UNTIS_USER"),
                password: required("UNTIS_PASS"),
            },
            caldav: CalDavSettings {
                url: caldav_url,
                username: required("ICLOUD_USER"),
                password: required("ICLOUD_PASS"),
                calendar_name: get("ICLOUD_CAL").unwrap_or_else(|| DEFAULT_CALENDAR_NAME.to_string()),
            },
            days_past: parse_number("DAYS_PAST", get("DAYS_PAST"), DEFAULT_DAYS_PAST)?,
            days_ahead: parse_number("DAYS_AHEAD", get("DAYS_AHEAD"), DEFAULT_DAYS_AHEAD)?,
            delete_missing: parse_bool("DELETE_MISSING", get("DELETE_MISSING"), true)?,
            mark_cancelled: parse_bool("MARK_CANCELLED", get("MARK_CANCELLED"), true)?,
            timezone,
            http_timeout: Duration::from_secs(http_timeout_secs),
            max_failure_ratio,
        })
    }

    /// The event builder matching these settings
    pub fn event_builder(&self) -> EventBuilder {
        EventBuilder::new(UID_NAMESPACE, &self.untis.server, self.timezone)
            .mark_cancelled(self.mark_cancelled)
    }

    /// The reconciliation settings matching these settings
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            delete_stale: self.delete_missing,
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("untis_server", &self.untis.server)
            .field("untis_school", &self.untis.school)
            .field("untis_user", &self.untis.username)
            .field("untis_pass", &"<redacted>")
            .field("caldav_url", &self.caldav.url.as_str())
            .field("caldav_user", &self.caldav.username)
            .field("caldav_pass", &"<redacted>")
            .field("calendar_name", &self.caldav.calendar_name)
            .field("days_past", &self.days_past)
            .field("days_ahead", &self.days_ahead)
            .field("delete_missing", &self.delete_missing)
            .field("mark_cancelled", &self.mark_cancelled)
            .field("timezone", &self.timezone.name())
            .field("http_timeout", &self.http_timeout)
            .field("max_failure_ratio", &self.max_failure_ratio)
            .finish()
    }
}

fn parse_bool(name: &'static str, value: Option<String>, default: bool) -> Result<bool> {
    let value = match value {
        None => return Ok(default),
        Some(v) => v,
    };
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidSetting {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_number<T>(name: &'static str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|err| Error::InvalidSetting {
            name,
            value: v.clone(),
            reason: err.to_string(),
        }),
    }
}
