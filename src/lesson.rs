//! Timetable lessons, the desired state of a sync

/// A display label (subject, teacher, room, class...) as the timetable server describes it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Label {
    /// Short form, e.g. `M`
    pub name: Option<String>,
    /// Long form, e.g. `Mathematics`
    pub long_name: Option<String>,
}

impl Label {
    pub fn new<S: ToString>(name: S) -> Self {
        Self { name: Some(name.to_string()), long_name: None }
    }

    pub fn with_long_name<S: ToString, T: ToString>(name: S, long_name: T) -> Self {
        Self { name: Some(name.to_string()), long_name: Some(long_name.to_string()) }
    }

    /// The long form, falling back to the short form. `None` when neither is usable
    pub fn display(&self) -> Option<&str> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| s.is_empty() == false)
        }
        non_empty(&self.long_name).or_else(|| non_empty(&self.name))
    }
}

/// Join the displayable labels of a list, in order
pub fn join_labels(labels: &[Label]) -> String {
    labels.iter()
        .filter_map(Label::display)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One scheduled lesson occurrence
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lesson {
    /// Identifier assigned by the timetable server. Lessons without one cannot be synced.
    pub id: Option<i64>,
    /// Date as `YYYYMMDD`
    pub date: u32,
    /// Local start time as `HHMM`
    pub start_time: u32,
    /// Local end time as `HHMM`
    pub end_time: u32,
    pub subjects: Vec<Label>,
    pub teachers: Vec<Label>,
    pub rooms: Vec<Label>,
    pub classes: Vec<Label>,
    pub cancelled: bool,
}

impl Lesson {
    /// Create a lesson with no labels
    pub fn new(id: i64, date: u32, start_time: u32, end_time: u32) -> Self {
        Self {
            id: Some(id),
            date, start_time, end_time,
            ..Self::default()
        }
    }

    /// A short description used in log lines
    pub fn describe(&self) -> String {
        let id = self.id.map(|id| id.to_string()).unwrap_or_else(|| "<no id>".to_string());
        format!("#{} on {} {:04}-{:04}", id, self.date, self.start_time, self.end_time)
    }
}
