//! Utilities to track the progression of a sync

/// A structure that tracks the progression and the errors that happen during a sync
pub struct SyncProgress {
    calendar: String,
    n_errors: u32,
    n_warnings: u32,
}

impl SyncProgress {
    pub fn new(calendar: &str) -> Self {
        Self { calendar: calendar.to_string(), n_errors: 0, n_warnings: 0 }
    }

    pub fn is_success(&self) -> bool {
        self.n_errors == 0
    }

    pub fn n_errors(&self) -> u32 { self.n_errors }
    pub fn n_warnings(&self) -> u32 { self.n_warnings }

    /// Log an error
    pub fn error(&mut self, text: &str) {
        log::error!("[{}] {}", self.calendar, text);
        self.n_errors += 1;
    }
    /// Log a warning
    pub fn warn(&mut self, text: &str) {
        log::warn!("[{}] {}", self.calendar, text);
        self.n_warnings += 1;
    }
    /// Log an info
    pub fn info(&mut self, text: &str) {
        log::info!("[{}] {}", self.calendar, text);
    }
    /// Log a debug message
    pub fn debug(&mut self, text: &str) {
        log::debug!("[{}] {}", self.calendar, text);
    }
    /// Log a trace message
    pub fn trace(&mut self, text: &str) {
        log::trace!("[{}] {}", self.calendar, text);
    }
}
