//! Multiple scenarios that are performed to test sync operations correctly work
//!
//! Each scenario describes the timetable during two consecutive runs, what the calendar holds beforehand,
//! and what the second run is expected to do.
#![cfg(feature = "local_calendar_mocks_remote_calendars")]

use untis_caldav_sync::{Label, Lesson};

pub const SERVER: &str = "poly.webuntis.com";

/// An event that another application has put into the calendar
pub const FOREIGN_EVENT: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Apple Inc.//iCloud//EN\r\nBEGIN:VEVENT\r\nUID:8F0D2A41-5E7B-4C3B-9C55-2F1A0B6E9D10\r\nDTSTART;TZID=Europe/Berlin:20240117T150000\r\nDTEND;TZID=Europe/Berlin:20240117T160000\r\nSUMMARY:Dentist\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

pub struct Expected {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

pub struct Scenario {
    pub name: &'static str,
    pub first_run: Vec<Lesson>,
    pub second_run: Vec<Lesson>,
    pub delete_stale: bool,
    pub mark_cancelled: bool,
    pub expected: Expected,
    /// Number of events in the calendar after both runs, foreign events included
    pub final_len: usize,
}

pub fn lesson(id: i64, date: u32, start: u32, end: u32, subject: &str, teacher: &str, room: &str) -> Lesson {
    let mut lesson = Lesson::new(id, date, start, end);
    lesson.subjects = vec![Label::new(subject)];
    lesson.teachers = vec![Label::new(teacher)];
    lesson.rooms = vec![Label::new(room)];
    lesson.classes = vec![Label::new("7b")];
    lesson
}

fn monday() -> Vec<Lesson> {
    vec![
        lesson(101, 20240115, 800, 845, "Mathematics", "Smith", "101"),
        lesson(102, 20240115, 850, 935, "English", "Jones", "204"),
        lesson(103, 20240115, 955, 1040, "Physics", "Curie", "Lab 1"),
        lesson(104, 20240115, 1045, 1130, "History", "Bloch", "101"),
    ]
}

pub fn scenarii() -> Vec<Scenario> {
    let mut scenarii = Vec::new();

    scenarii.push(Scenario {
        name: "nothing changed",
        first_run: monday(),
        second_run: monday(),
        delete_stale: true,
        mark_cancelled: true,
        expected: Expected { created: 0, updated: 0, deleted: 0, unchanged: 4 },
        final_len: 5,
    });

    let mut moved = monday();
    moved[0].rooms = vec![Label::new("102")];
    moved[2].start_time = 1000;
    moved[2].end_time = 1045;
    scenarii.push(Scenario {
        name: "a room and a time change",
        first_run: monday(),
        second_run: moved,
        delete_stale: true,
        mark_cancelled: true,
        expected: Expected { created: 0, updated: 2, deleted: 0, unchanged: 2 },
        final_len: 5,
    });

    let mut cancelled = monday();
    cancelled[1].cancelled = true;
    scenarii.push(Scenario {
        name: "a cancellation",
        first_run: monday(),
        second_run: cancelled.clone(),
        delete_stale: true,
        mark_cancelled: true,
        expected: Expected { created: 0, updated: 1, deleted: 0, unchanged: 3 },
        final_len: 5,
    });
    scenarii.push(Scenario {
        name: "a cancellation that is not marked",
        first_run: monday(),
        second_run: cancelled,
        delete_stale: true,
        mark_cancelled: false,
        expected: Expected { created: 0, updated: 0, deleted: 0, unchanged: 4 },
        final_len: 5,
    });

    let mut reshuffled = monday();
    reshuffled.remove(3);
    reshuffled.push(lesson(105, 20240116, 800, 845, "Biology", "Darwin", "Lab 2"));
    scenarii.push(Scenario {
        name: "a lesson replaced by another one",
        first_run: monday(),
        second_run: reshuffled.clone(),
        delete_stale: true,
        mark_cancelled: true,
        expected: Expected { created: 1, updated: 0, deleted: 1, unchanged: 3 },
        final_len: 5,
    });
    scenarii.push(Scenario {
        name: "a lesson replaced by another one, without deletions",
        first_run: monday(),
        second_run: reshuffled,
        delete_stale: false,
        mark_cancelled: true,
        expected: Expected { created: 1, updated: 0, deleted: 0, unchanged: 3 },
        final_len: 6,
    });

    scenarii.push(Scenario {
        name: "the timetable went empty",
        first_run: monday(),
        second_run: Vec::new(),
        delete_stale: true,
        mark_cancelled: true,
        expected: Expected { created: 0, updated: 0, deleted: 4, unchanged: 0 },
        final_len: 1,
    });

    scenarii
}
