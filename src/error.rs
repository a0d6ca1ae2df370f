//! Errors that can happen during a sync run

use thiserror::Error;

/// Process exit code when the configuration is missing or invalid
pub const EXIT_CONFIG: i32 = 2;
/// Process exit code for any other failure during a run
pub const EXIT_RUNTIME: i32 = 1;

/// Main error type of this crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required setting(s): {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    #[error("invalid value {value:?} for setting {name}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timetable login failed: {0}")]
    SourceAuth(String),

    #[error("timetable protocol error: {0}")]
    SourceProtocol(String),

    #[error("CalDAV error: {0}")]
    Dav(String),

    #[error("the calendar server rejected the credentials (HTTP {0})")]
    DavUnauthorized(u16),

    #[error("unexpected HTTP status {status} for {url}")]
    DavStatus { status: u16, url: String },

    #[error("no calendar is available on the server")]
    NoCalendar,

    #[error("invalid lesson {id}: {reason}")]
    InvalidLesson { id: String, reason: String },

    #[error("unable to parse iCal data: {0}")]
    ICal(String),

    #[error("invalid XML: {0}")]
    Xml(#[from] minidom::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} of {attempted} calendar writes failed")]
    TooManyFailures { failed: usize, attempted: usize },

    #[cfg(any(test, feature = "local_calendar_mocks_remote_calendars"))]
    #[error("mocked failure: {0}")]
    Mocked(String),
}

impl Error {
    /// Whether this error happened while validating the configuration, before any network call
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::MissingSettings(_) | Error::InvalidSetting { .. })
    }

    /// The process exit code that reports this error
    pub fn exit_code(&self) -> i32 {
        if self.is_config_error() {
            EXIT_CONFIG
        } else {
            EXIT_RUNTIME
        }
    }
}

/// Result type alias with this crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
