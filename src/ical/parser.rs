//! A module to parse ICal files

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;

use crate::error::{Error, Result};

/// What we need to know about a stored event
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedEvent {
    pub uid: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ParsedEvent {
    /// Whether this event overlaps `[start, end]`. Events whose times are unknown are assumed to overlap
    pub fn overlaps(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        let begins_before_end = self.start.map(|s| &s <= end).unwrap_or(true);
        let ends_after_start = self.end.or(self.start).map(|e| &e >= start).unwrap_or(true);
        begins_before_end && ends_after_start
    }
}

/// Parse the first `VEVENT` of an iCal file
pub fn parse_event(content: &str) -> Result<ParsedEvent> {
    let mut reader = ical::IcalParser::new(content.as_bytes());
    let calendar = match reader.next() {
        None => return Err(Error::ICal("empty iCal data".to_string())),
        Some(Err(err)) => return Err(Error::ICal(err.to_string())),
        Some(Ok(calendar)) => calendar,
    };

    let event = match calendar.events.get(0) {
        None => return Err(Error::ICal("no VEVENT in this iCal data".to_string())),
        Some(event) => event,
    };

    let uid = match property(event, "UID").and_then(|p| p.value.clone()) {
        Some(uid) if uid.trim().is_empty() == false => uid.trim().to_string(),
        _ => return Err(Error::ICal("VEVENT has no UID".to_string())),
    };

    Ok(ParsedEvent {
        uid,
        start: property(event, "DTSTART").and_then(parse_date_time),
        end: property(event, "DTEND").and_then(parse_date_time),
    })
}

fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a Property> {
    event.properties.iter().find(|prop| prop.name.eq_ignore_ascii_case(name))
}

fn param<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.params.as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.get(0))
        .map(|value| value.as_str())
}

/// Supports UTC (`...Z`), local with a `TZID`, floating (taken as UTC) and date-only values
fn parse_date_time(prop: &Property) -> Option<DateTime<Utc>> {
    let value = prop.value.as_ref()?.trim();

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(Utc.from_utc_datetime(&naive));
    }

    let naive = match NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        Ok(naive) => naive,
        Err(_) => {
            let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
            date.and_hms_opt(0, 0, 0)?
        }
    };

    match param(prop, "TZID").and_then(|tzid| tzid.trim_matches('"').parse::<Tz>().ok()) {
        None => Some(Utc.from_utc_datetime(&naive)),
        Some(tz) => tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}
