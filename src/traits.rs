use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::ical::BuiltEvent;
use crate::item::{EventHandle, StoredEvent};
use crate::lesson::Lesson;

/// The person whose timetable is mirrored
#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: i64,
    /// Element type as the timetable server encodes it (e.g. 5 for students)
    pub kind: i64,
}

/// Where lessons come from
#[async_trait]
pub trait TimetableSource {
    /// Returns the person the configured account belongs to.
    /// This may trigger a login
    async fn current_person(&mut self) -> Result<Person>;

    /// Returns every lesson of `person` between `start` and `end` (both included)
    async fn fetch_lessons(&mut self, person: &Person, start: NaiveDate, end: NaiveDate) -> Result<Vec<Lesson>>;
}

/// A calendar that stores serialized events, addressed by opaque handles
#[async_trait]
pub trait CalendarStore {
    /// Returns the name of the calendar
    fn name(&self) -> &str;

    /// Returns every stored event that overlaps `[start, end]`.
    ///
    /// A query the server refuses in a recoverable way yields an empty list. Connectivity or authentication failures are errors.
    async fn query_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<StoredEvent>>;

    /// Stores a new event and returns its handle
    async fn add(&mut self, event: &BuiltEvent) -> Result<EventHandle>;

    /// Replaces the content of an existing event
    async fn update(&mut self, handle: &EventHandle, event: &BuiltEvent) -> Result<EventHandle>;

    /// Removes an event. Fails without any effect if the handle does not exist (anymore)
    async fn delete(&mut self, handle: &EventHandle) -> Result<()>;
}
