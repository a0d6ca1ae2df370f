//! In-memory stand-ins for the calendar server and the timetable server, used by tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use url::Url;

use crate::error::{Error, Result};
use crate::ical::{parse_event, BuiltEvent};
use crate::item::{EventHandle, StoredEvent, VersionTag};
use crate::lesson::Lesson;
use crate::mock_behaviour::MockBehaviour;
use crate::traits::{CalendarStore, Person, TimetableSource};
use crate::window::date_as_int;

const MEMORY_CALENDAR_URL: &str = "memory://calendars/default/";

/// A calendar that lives in memory, and behaves like a (well-behaved) CalDAV collection
#[derive(Debug)]
pub struct MemoryCalendar {
    name: String,
    url: Url,
    items: BTreeMap<Url, StoredEvent>,
    last_version: u64,

    mock_behaviour: Option<Arc<Mutex<MockBehaviour>>>,
}

impl MemoryCalendar {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: Url::parse(MEMORY_CALENDAR_URL).expect("a valid static URL"),
            items: BTreeMap::new(),
            last_version: 0,
            mock_behaviour: None,
        }
    }

    /// A calendar whose operations fail as `behaviour` dictates
    pub fn with_mock_behaviour(name: &str, behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        let mut cal = Self::new(name);
        cal.mock_behaviour = Some(behaviour);
        cal
    }

    /// Store a raw payload, as another client of the server would do
    pub fn insert_raw(&mut self, file_name: &str, payload: &str) -> Result<EventHandle> {
        let href = self.url.join(file_name)?;
        let etag = self.next_version();
        self.items.insert(href.clone(), StoredEvent {
            handle: EventHandle::new(href.clone(), Some(etag.clone())),
            payload: payload.to_string(),
        });
        Ok(EventHandle::new(href, Some(etag)))
    }

    /// Every stored event, in href order
    pub fn events(&self) -> Vec<&StoredEvent> {
        self.items.values().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The stored event carrying this UID, if any
    pub fn find_by_uid(&self, uid: &str) -> Option<&StoredEvent> {
        self.items.values()
            .find(|event| parse_event(&event.payload).map(|parsed| parsed.uid == uid).unwrap_or(false))
    }

    fn next_version(&mut self) -> VersionTag {
        self.last_version += 1;
        VersionTag::from(format!("\"{}\"", self.last_version))
    }

    fn check<F>(&self, allowed: F) -> Result<()>
    where
        F: FnOnce(&mut MockBehaviour) -> Result<()>,
    {
        match &self.mock_behaviour {
            None => Ok(()),
            Some(behaviour) => {
                let mut behaviour = behaviour.lock()
                    .map_err(|_| Error::Mocked("poisoned mock behaviour".to_string()))?;
                allowed(&mut behaviour)
            },
        }
    }

    fn existing(&self, handle: &EventHandle) -> Result<&StoredEvent> {
        let stored = self.items.get(handle.href()).ok_or_else(|| Error::DavStatus {
            status: 404,
            url: handle.href().to_string(),
        })?;
        if let Some(etag) = handle.etag() {
            if stored.handle.etag() != Some(etag) {
                return Err(Error::DavStatus { status: 412, url: handle.href().to_string() });
            }
        }
        Ok(stored)
    }
}

#[async_trait]
impl CalendarStore for MemoryCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<StoredEvent>> {
        self.check(|b| b.can_query())?;

        Ok(self.items.values()
            .filter(|event| match parse_event(&event.payload) {
                Ok(parsed) => parsed.overlaps(&start, &end),
                // Let the caller decide what to do with garbage
                Err(_) => true,
            })
            .cloned()
            .collect())
    }

    async fn add(&mut self, event: &BuiltEvent) -> Result<EventHandle> {
        self.check(|b| b.can_add_item())?;

        let href = self.url.join(&format!("{}.ics", sanitize_filename::sanitize(&event.uid)))?;
        if self.items.contains_key(&href) {
            log::warn!("{} already exists, overwriting it", href);
        }
        let handle = EventHandle::new(href.clone(), Some(self.next_version()));
        self.items.insert(href, StoredEvent { handle: handle.clone(), payload: event.payload.clone() });
        Ok(handle)
    }

    async fn update(&mut self, handle: &EventHandle, event: &BuiltEvent) -> Result<EventHandle> {
        self.check(|b| b.can_update_item())?;
        self.existing(handle)?;

        let new_handle = EventHandle::new(handle.href().clone(), Some(self.next_version()));
        self.items.insert(handle.href().clone(), StoredEvent { handle: new_handle.clone(), payload: event.payload.clone() });
        Ok(new_handle)
    }

    async fn delete(&mut self, handle: &EventHandle) -> Result<()> {
        self.check(|b| b.can_delete_item())?;
        self.existing(handle)?;

        self.items.remove(handle.href());
        Ok(())
    }
}


/// A timetable that serves a fixed list of lessons
#[derive(Clone, Debug)]
pub struct StaticTimetable {
    person: Person,
    lessons: Vec<Lesson>,
    fetch_count: usize,
}

impl StaticTimetable {
    pub fn new(lessons: Vec<Lesson>) -> Self {
        Self {
            person: Person { id: 4242, kind: 5 },
            lessons,
            fetch_count: 0,
        }
    }

    pub fn lessons_mut(&mut self) -> &mut Vec<Lesson> {
        &mut self.lessons
    }

    /// How many times lessons have been fetched
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }
}

#[async_trait]
impl TimetableSource for StaticTimetable {
    async fn current_person(&mut self) -> Result<Person> {
        Ok(self.person.clone())
    }

    async fn fetch_lessons(&mut self, person: &Person, start: NaiveDate, end: NaiveDate) -> Result<Vec<Lesson>> {
        if person != &self.person {
            return Err(Error::SourceProtocol(format!("unknown person {}", person.id)));
        }
        self.fetch_count += 1;

        let (start, end) = (date_as_int(start), date_as_int(end));
        Ok(self.lessons.iter()
            .filter(|lesson| start <= lesson.date && lesson.date <= end)
            .cloned()
            .collect())
    }
}
