//! A module to build ICal files

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use ics::parameters::TzIDParam;
use ics::properties::{Description, DtEnd, DtStart, Location, Status, Summary};
use ics::{escape_text, ICalendar};

use crate::error::{Error, Result};
use crate::lesson::{join_labels, Lesson};

/// Summary of lessons that have no subject
pub const DEFAULT_SUMMARY: &str = "Lesson";

/// The output of [`EventBuilder::build`]
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltEvent {
    pub uid: String,
    /// A complete `VCALENDAR` holding a single `VEVENT`
    pub payload: String,
}

impl BuiltEvent {
    /// See [`super::fingerprint`]
    pub fn fingerprint(&self) -> String {
        super::fingerprint(&self.payload)
    }
}

/// Turns lessons into iCal events with stable UIDs
#[derive(Clone, Debug)]
pub struct EventBuilder {
    namespace: String,
    server: String,
    tz: Tz,
    mark_cancelled: bool,
    prod_id: String,
}

impl EventBuilder {
    /// `namespace` tags the UIDs as ours, `server` keeps lessons of different timetable servers apart,
    /// `tz` is the civil time zone lesson times are expressed in
    pub fn new<S: ToString, T: ToString>(namespace: S, server: T, tz: Tz) -> Self {
        Self {
            namespace: namespace.to_string(),
            server: server.to_string(),
            tz,
            mark_cancelled: true,
            prod_id: super::default_prod_id(),
        }
    }

    /// Whether cancelled lessons get a `STATUS:CANCELLED`
    pub fn mark_cancelled(mut self, mark: bool) -> Self {
        self.mark_cancelled = mark;
        self
    }

    /// Whether `uid` follows our naming scheme, i.e. whether the event is ours to delete
    pub fn owns(&self, uid: &str) -> bool {
        uid.strip_prefix(self.namespace.as_str())
            .map(|rest| rest.starts_with('-'))
            .unwrap_or(false)
    }

    /// The UID of a lesson. Lessons without an id must be filtered out before, they would get an empty id segment
    pub fn uid_for(&self, lesson: &Lesson) -> String {
        let id = lesson.id.map(|id| id.to_string()).unwrap_or_default();
        format!("{}-{}@{}", self.namespace, id, self.server)
    }

    /// Create an iCal event from a lesson.
    ///
    /// `stamped_at` only ends up in `DTSTAMP`, which [`super::fingerprint`] ignores.
    pub fn build(&self, lesson: &Lesson, stamped_at: DateTime<Utc>) -> Result<BuiltEvent> {
        let uid = self.uid_for(lesson);
        let start = self.local_date_time(lesson, lesson.start_time)?;
        let end = self.local_date_time(lesson, lesson.end_time)?;

        let subjects = join_labels(&lesson.subjects);
        let summary = if subjects.is_empty() { DEFAULT_SUMMARY.to_string() } else { subjects };
        let rooms = join_labels(&lesson.rooms);

        let mut event = ics::Event::new(uid.clone(), format_utc(&stamped_at));
        event.push(Summary::new(escape_text(summary)));

        let mut dtstart = DtStart::new(start);
        dtstart.add(TzIDParam::new(self.tz.name()));
        event.push(dtstart);
        let mut dtend = DtEnd::new(end);
        dtend.add(TzIDParam::new(self.tz.name()));
        event.push(dtend);

        event.push(Location::new(escape_text(rooms)));
        event.push(Description::new(escape_text(description(lesson))));
        if lesson.cancelled && self.mark_cancelled {
            event.push(Status::cancelled());
        }

        let mut calendar = ICalendar::new("2.0", self.prod_id.clone());
        calendar.add_event(event);

        Ok(BuiltEvent { uid, payload: calendar.to_string() })
    }

    /// Lesson date and `HHMM` time, as a local `YYYYMMDDTHHMMSS` string (checked against the time zone)
    fn local_date_time(&self, lesson: &Lesson, time: u32) -> Result<String> {
        let invalid = |reason: String| Error::InvalidLesson { id: lesson.describe(), reason };

        let (year, month, day) = (lesson.date / 10_000, lesson.date / 100 % 100, lesson.date % 100);
        let date = NaiveDate::from_ymd_opt(year as i32, month, day)
            .ok_or_else(|| invalid(format!("{} is not a valid date", lesson.date)))?;
        let time_of_day = NaiveTime::from_hms_opt(time / 100, time % 100, 0)
            .ok_or_else(|| invalid(format!("{:04} is not a valid time", time)))?;

        let local = NaiveDateTime::new(date, time_of_day);
        if self.tz.from_local_datetime(&local).earliest().is_none() {
            return Err(invalid(format!("{} does not exist in {}", local, self.tz.name())));
        }
        Ok(local.format("%Y%m%dT%H%M%S").to_string())
    }
}

/// `Teacher: …`, `Room: …` and `Class: …` lines, skipping the empty ones
fn description(lesson: &Lesson) -> String {
    let lines = [
        ("Teacher", join_labels(&lesson.teachers)),
        ("Room", join_labels(&lesson.rooms)),
        ("Class", join_labels(&lesson.classes)),
    ];
    lines.iter()
        .filter(|(_, value)| value.is_empty() == false)
        .map(|(title, value)| format!("{}: {}", title, value))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;
    use crate::lesson::Label;

    fn builder() -> EventBuilder {
        EventBuilder::new("untis", "poly.webuntis.com", Berlin)
    }

    fn maths() -> Lesson {
        Lesson {
            subjects: vec![Label::with_long_name("M", "Mathematics")],
            teachers: vec![Label::with_long_name("SMI", "Smith")],
            rooms: vec![Label::new("101")],
            classes: vec![Label::new("5a"), Label::new("5b")],
            ..Lesson::new(4242, 20240115, 800, 845)
        }
    }

    fn stamp(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, 0, 0).unwrap()
    }

    fn lines(event: &BuiltEvent) -> Vec<String> {
        event.payload.lines().map(String::from).collect()
    }

    #[test]
    fn test_ical_from_lesson() {
        let event = builder().build(&maths(), stamp(7)).unwrap();
        assert_eq!(event.uid, "untis-4242@poly.webuntis.com");
        assert!(event.payload.contains("\r\n"));

        let expected = vec![
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//Untis CalDAV Sync//EN",
            "BEGIN:VEVENT",
            "UID:untis-4242@poly.webuntis.com",
            "DTSTAMP:20240110T070000Z",
            "SUMMARY:Mathematics",
            "DTSTART;TZID=Europe/Berlin:20240115T080000",
            "DTEND;TZID=Europe/Berlin:20240115T084500",
            "LOCATION:101",
            "DESCRIPTION:Teacher: Smith\\nRoom: 101\\nClass: 5a\\, 5b",
            "END:VEVENT",
            "END:VCALENDAR",
        ];
        assert_eq!(lines(&event), expected);
    }

    #[test]
    fn uid_is_stable() {
        let b = builder();
        let first = b.build(&maths(), stamp(7)).unwrap();
        let second = b.build(&maths(), stamp(9)).unwrap();
        assert_eq!(first.uid, second.uid);
        assert_eq!(first.fingerprint(), second.fingerprint());

        let other_server = EventBuilder::new("untis", "other.webuntis.com", Berlin);
        assert_ne!(other_server.uid_for(&maths()), first.uid);
    }

    #[test]
    fn missing_labels_use_placeholders() {
        let lesson = Lesson::new(1, 20240115, 1000, 1045);
        let event = builder().build(&lesson, stamp(7)).unwrap();
        let lines = lines(&event);
        assert!(lines.contains(&format!("SUMMARY:{}", DEFAULT_SUMMARY)));
        assert!(lines.contains(&"LOCATION:".to_string()));
        assert!(lines.contains(&"DESCRIPTION:".to_string()));
    }

    #[test]
    fn description_skips_empty_fields() {
        let lesson = Lesson {
            rooms: vec![Label::new("Gym")],
            ..Lesson::new(1, 20240115, 1000, 1045)
        };
        assert_eq!(description(&lesson), "Room: Gym");
    }

    #[test]
    fn cancellation_marking() {
        let cancelled = Lesson { cancelled: true, ..maths() };

        let marked = builder().build(&cancelled, stamp(7)).unwrap();
        assert!(lines(&marked).contains(&"STATUS:CANCELLED".to_string()));

        let unmarked = builder().mark_cancelled(false).build(&cancelled, stamp(7)).unwrap();
        assert!(unmarked.payload.contains("STATUS") == false);

        // Nothing else changes
        let without_status: Vec<String> = lines(&marked).into_iter().filter(|l| l != "STATUS:CANCELLED").collect();
        assert_eq!(without_status, lines(&unmarked));

        // Not cancelled: no status even when marking is enabled
        let regular = builder().build(&maths(), stamp(7)).unwrap();
        assert_eq!(lines(&regular), lines(&unmarked));
    }

    #[test]
    fn invalid_times_are_rejected() {
        let bad_date = Lesson::new(1, 20241345, 800, 845);
        assert!(matches!(builder().build(&bad_date, stamp(7)), Err(Error::InvalidLesson { .. })));

        let bad_time = Lesson::new(1, 20240115, 875, 945);
        assert!(matches!(builder().build(&bad_time, stamp(7)), Err(Error::InvalidLesson { .. })));

        // Clocks jump from 02:00 to 03:00 on that day
        let dst_gap = Lesson::new(1, 20240331, 230, 300);
        assert!(matches!(builder().build(&dst_gap, stamp(7)), Err(Error::InvalidLesson { .. })));
    }

    #[test]
    fn ownership_follows_the_namespace() {
        let b = builder();
        assert!(b.owns("untis-12@poly.webuntis.com"));
        assert!(b.owns("untis-@poly.webuntis.com"));
        assert!(b.owns("untisx-12@poly.webuntis.com") == false);
        assert!(b.owns("0633de27-8c32-42be-bcb8-63bc879c6185") == false);
    }
}
