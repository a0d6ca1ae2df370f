//! Wire records of the timetable server, and their conversion into lessons

use serde::Deserialize;

use crate::lesson::{Label, Lesson};
use crate::traits::Person;

const CANCELLED_CODE: &str = "cancelled";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(alias = "elemId")]
    pub person_id: i64,
    #[serde(alias = "elemType")]
    pub person_type: i64,
}

impl From<UserData> for Person {
    fn from(data: UserData) -> Self {
        Person { id: data.person_id, kind: data.person_type }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawLabel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    longname: Option<String>,
}

impl From<RawLabel> for Label {
    fn from(raw: RawLabel) -> Self {
        Label { name: raw.name, long_name: raw.longname }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLesson {
    #[serde(default)]
    id: Option<i64>,
    date: u32,
    start_time: u32,
    end_time: u32,
    #[serde(default)]
    su: Option<Vec<RawLabel>>,
    #[serde(default)]
    te: Option<Vec<RawLabel>>,
    #[serde(default)]
    ro: Option<Vec<RawLabel>>,
    #[serde(default)]
    kl: Option<Vec<RawLabel>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    cancelled: Option<bool>,
}

fn labels(raw: Option<Vec<RawLabel>>) -> Vec<Label> {
    raw.unwrap_or_default().into_iter().map(Label::from).collect()
}

impl From<RawLesson> for Lesson {
    fn from(raw: RawLesson) -> Self {
        let cancelled = raw.code.as_deref() == Some(CANCELLED_CODE) || raw.cancelled.unwrap_or(false);
        Lesson {
            id: raw.id,
            date: raw.date,
            start_time: raw.start_time,
            end_time: raw.end_time,
            subjects: labels(raw.su),
            teachers: labels(raw.te),
            rooms: labels(raw.ro),
            classes: labels(raw.kl),
            cancelled,
        }
    }
}
