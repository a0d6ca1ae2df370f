//! This crate mirrors a WebUntis timetable into a CalDAV calendar (e.g. iCloud).
//!
//! Lessons come from a [`TimetableSource`](traits::TimetableSource), usually an [`UntisClient`](untis::UntisClient). \
//! Events go to a [`CalendarStore`](traits::CalendarStore), usually a [`RemoteCalendar`](calendar::remote_calendar::RemoteCalendar)
//! found (or created) by a CalDAV [`Client`](client::Client).
//!
//! A [`Reconciler`] ties both together. Each sync pass turns lessons into events with stable UIDs,
//! compares them to what the calendar holds, and only writes what changed. Events that were not created by this crate are never touched.

pub mod traits;
pub mod error;
pub use error::{Error, Result};
pub mod config;
pub use config::Config;

pub mod lesson;
pub use lesson::{Label, Lesson};
pub mod window;
pub use window::SyncWindow;
mod item;
pub use item::{EventHandle, StoredEvent, VersionTag};
pub mod ical;

pub mod calendar;
pub use calendar::remote_calendar::RemoteCalendar;
pub mod reconciler;
pub use reconciler::{Reconciler, SyncReport, SyncSettings};

pub mod client;
pub mod untis;
pub use untis::UntisClient;

pub mod resource;
pub mod utils;

pub mod mock_behaviour;
