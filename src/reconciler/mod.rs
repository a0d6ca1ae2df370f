//! This module mirrors the lessons of a timetable into a calendar
//!
//! A [`Reconciler`] runs sync passes: it fetches the wanted lessons, compares them to what the calendar
//! already holds, and applies the minimal set of writes to make the calendar match.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::ical::{fingerprint, parse_event, BuiltEvent, EventBuilder};
use crate::item::StoredEvent;
use crate::traits::{CalendarStore, TimetableSource};
use crate::window::SyncWindow;

pub mod sync_progress;
use sync_progress::SyncProgress;


/// Tweaks of a sync pass
#[derive(Clone, Debug, PartialEq)]
pub struct SyncSettings {
    /// Whether our events that no longer match a lesson are deleted
    pub delete_stale: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { delete_stale: true }
    }
}


/// A write the reconciler attempted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::Create => write!(f, "create"),
            SyncAction::Update => write!(f, "update"),
            SyncAction::Delete => write!(f, "delete"),
        }
    }
}

/// What happened to a single event during a pass
#[derive(Debug)]
pub struct ItemOutcome {
    pub uid: String,
    pub action: SyncAction,
    /// `None` when the write succeeded
    pub error: Option<Error>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}


/// The result of a sync pass
#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Events that already matched their lesson
    pub unchanged: usize,
    /// Lessons that could not be turned into events (no id, invalid date...)
    pub skipped_lessons: usize,
    /// Every attempted write, in the order they were made
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncReport {
    /// The writes that failed
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_success() == false)
    }

    /// Returns `Error::TooManyFailures` when more than `max_ratio` of the attempted writes failed
    pub fn check_failure_ratio(&self, max_ratio: f64) -> Result<()> {
        let attempted = self.outcomes.len();
        let failed = self.failures().count();
        if attempted == 0 {
            return Ok(());
        }
        if failed as f64 / attempted as f64 > max_ratio {
            return Err(Error::TooManyFailures { failed, attempted });
        }
        Ok(())
    }

    fn record(&mut self, uid: &str, action: SyncAction, result: Result<()>) {
        let error = match result {
            Ok(()) => {
                match action {
                    SyncAction::Create => self.created += 1,
                    SyncAction::Update => self.updated += 1,
                    SyncAction::Delete => self.deleted += 1,
                }
                None
            },
            Err(err) => Some(err),
        };
        self.outcomes.push(ItemOutcome { uid: uid.to_string(), action, error });
    }
}

impl Display for SyncReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "created={} updated={} deleted={}", self.created, self.updated, self.deleted)
    }
}


/// Mirrors a [`TimetableSource`] into a [`CalendarStore`].
///
/// The calendar is the only state that outlives a pass: every pass re-reads it instead of remembering what it wrote.
pub struct Reconciler<S, C>
where
    S: TimetableSource,
    C: CalendarStore,
{
    source: S,
    store: C,
    builder: EventBuilder,
    settings: SyncSettings,
}

impl<S, C> Reconciler<S, C>
where
    S: TimetableSource,
    C: CalendarStore,
{
    pub fn new(source: S, store: C, builder: EventBuilder, settings: SyncSettings) -> Self {
        Self { source, store, builder, settings }
    }

    /// Returns the timetable lessons come from
    pub fn source_mut(&mut self) -> &mut S { &mut self.source }
    /// Returns the calendar that is written to
    pub fn store(&self) -> &C { &self.store }
    /// Returns the calendar that is written to
    pub fn store_mut(&mut self) -> &mut C { &mut self.store }

    /// Run a sync pass over `window`.
    ///
    /// Failing to read either side aborts the pass before anything is written.
    /// Individual write failures do not: they are logged, listed in the report, and left out of the counts.
    /// Running a pass again after an interruption converges to the same state.
    pub async fn sync(&mut self, window: &SyncWindow) -> Result<SyncReport> {
        let mut progress = SyncProgress::new(self.store.name());
        let mut report = SyncReport::default();
        progress.info(&format!("Starting a sync from {} to {}", window.start(), window.end()));

        let wanted = self.wanted_events(window, &mut progress, &mut report).await?;
        let existing = self.existing_events(window, &mut progress).await?;

        for (uid, event) in &wanted {
            match existing.get(uid) {
                None => {
                    progress.debug(&format!("Creating {}", uid));
                    let result = self.store.add(event).await.map(|_| ());
                    log_failure(&mut progress, uid, SyncAction::Create, &result);
                    report.record(uid, SyncAction::Create, result);
                },
                Some(stored) if fingerprint(&stored.payload) != event.fingerprint() => {
                    progress.debug(&format!("Updating {}", uid));
                    let result = self.store.update(&stored.handle, event).await.map(|_| ());
                    log_failure(&mut progress, uid, SyncAction::Update, &result);
                    report.record(uid, SyncAction::Update, result);
                },
                Some(_) => {
                    progress.trace(&format!("{} is up to date", uid));
                    report.unchanged += 1;
                },
            }
        }

        if self.settings.delete_stale {
            for (uid, stored) in &existing {
                if wanted.contains_key(uid) || self.builder.owns(uid) == false {
                    continue;
                }
                progress.debug(&format!("Deleting {}", uid));
                let result = self.store.delete(&stored.handle).await;
                log_failure(&mut progress, uid, SyncAction::Delete, &result);
                report.record(uid, SyncAction::Delete, result);
            }
        }

        progress.info(&format!("Sync finished: {} ({} unchanged, {} failed)",
            report, report.unchanged, report.failures().count()));
        Ok(report)
    }

    /// The events the lessons of `window` turn into, by UID
    async fn wanted_events(&mut self, window: &SyncWindow, progress: &mut SyncProgress, report: &mut SyncReport) -> Result<BTreeMap<String, BuiltEvent>> {
        let person = self.source.current_person().await?;
        let lessons = self.source.fetch_lessons(&person, window.start(), window.end()).await?;
        progress.debug(&format!("{} lessons fetched", lessons.len()));

        let stamped_at = Utc::now();
        let mut wanted = BTreeMap::new();
        for lesson in &lessons {
            if lesson.id.is_none() {
                progress.warn(&format!("Skipping lesson {}: it has no id", lesson.describe()));
                report.skipped_lessons += 1;
                continue;
            }
            match self.builder.build(lesson, stamped_at) {
                Err(err) => {
                    progress.warn(&format!("Skipping lesson {}: {}", lesson.describe(), err));
                    report.skipped_lessons += 1;
                },
                Ok(event) => {
                    // Later lessons win
                    wanted.insert(event.uid.clone(), event);
                },
            }
        }
        Ok(wanted)
    }

    /// The events of the calendar that overlap `window`, by UID
    async fn existing_events(&self, window: &SyncWindow, progress: &mut SyncProgress) -> Result<BTreeMap<String, StoredEvent>> {
        let stored_events = self.store.query_by_date_range(window.start_instant(), window.end_instant()).await?;
        progress.debug(&format!("{} events found in the calendar", stored_events.len()));

        let mut existing = BTreeMap::new();
        for stored in stored_events {
            let uid = match parse_event(&stored.payload) {
                Err(err) => {
                    progress.debug(&format!("Ignoring {}, that cannot be parsed: {}", stored.handle, err));
                    continue;
                },
                Ok(parsed) => parsed.uid,
            };
            if let Some(previous) = existing.insert(uid.clone(), stored) {
                progress.warn(&format!("{} is stored more than once. Ignoring {}", uid, previous.handle));
            }
        }
        Ok(existing)
    }
}

fn log_failure(progress: &mut SyncProgress, uid: &str, action: SyncAction, result: &Result<()>) {
    if let Err(err) = result {
        progress.error(&format!("Unable to {} {}: {}", action, uid, err));
    }
}
