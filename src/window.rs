//! The date range a sync pass operates on

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// A range of whole days in the timetable's civil time zone
#[derive(Clone, Debug, PartialEq)]
pub struct SyncWindow {
    start: NaiveDate,
    end: NaiveDate,
    tz: Tz,
}

impl SyncWindow {
    /// The window spanning `lookback` days before `today` to `lookahead` days after it (both included)
    pub fn around(today: NaiveDate, lookback: u32, lookahead: u32, tz: Tz) -> Self {
        Self {
            start: today - Duration::days(i64::from(lookback)),
            end: today + Duration::days(i64::from(lookahead)),
            tz,
        }
    }

    /// The current date in `tz`
    pub fn today(tz: Tz) -> NaiveDate {
        Utc::now().with_timezone(&tz).date_naive()
    }

    pub fn start(&self) -> NaiveDate { self.start }
    pub fn end(&self) -> NaiveDate { self.end }
    pub fn tz(&self) -> Tz { self.tz }

    /// First day, in the `YYYYMMDD` form the timetable server expects
    pub fn start_as_int(&self) -> u32 {
        date_as_int(self.start)
    }

    /// Last day, in the `YYYYMMDD` form the timetable server expects
    pub fn end_as_int(&self) -> u32 {
        date_as_int(self.end)
    }

    /// Midnight at the beginning of the first day
    pub fn start_instant(&self) -> DateTime<Utc> {
        localize(self.tz, self.start.and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default()))
    }

    /// The last second of the last day
    pub fn end_instant(&self) -> DateTime<Utc> {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
        localize(self.tz, self.end.and_time(last_second))
    }
}

/// `YYYYMMDD`
pub(crate) fn date_as_int(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Wall-clock time to UTC. Times inside a DST gap are shifted forward by an hour
fn localize(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let shifted = local + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&local))
        }
    }
}
