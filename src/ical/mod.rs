//! This module handles conversion between lessons and iCal files
//!
//! It is a wrapper around different Rust third-party libraries, since I haven't find any complete library that is able to parse _and_ generate iCal files

mod parser;
pub use parser::{parse_event, ParsedEvent};
mod builder;
pub use builder::{BuiltEvent, EventBuilder, DEFAULT_SUMMARY};

use crate::config::ORG_NAME;

pub fn default_prod_id() -> String {
    format!("-//{}//EN", ORG_NAME)
}

/// Properties that are stamped at build time and must not take part in change detection
const VOLATILE_PROPERTIES: [&str; 1] = ["DTSTAMP"];

/// The part of an iCal payload that matters when deciding whether an event has changed.
///
/// Lines are unfolded, line endings normalized and volatile properties (`DTSTAMP`) dropped,
/// so that building the same lesson twice yields the same fingerprint.
pub fn fingerprint(payload: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for raw in payload.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.starts_with(' ') || raw.starts_with('\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(&raw[1..]);
                continue;
            }
        }
        lines.push(raw.to_string());
    }

    lines.into_iter()
        .filter(|line| line.is_empty() == false)
        .filter(|line| is_volatile(line) == false)
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_volatile(line: &str) -> bool {
    let name_end = line.find(|c| c == ':' || c == ';').unwrap_or(line.len());
    let name = &line[..name_end];
    VOLATILE_PROPERTIES.iter().any(|volatile| name.eq_ignore_ascii_case(volatile))
}
