pub mod remote_calendar;
#[cfg(any(test, feature = "local_calendar_mocks_remote_calendars"))]
pub mod memory_calendar;

use std::convert::TryFrom;

use bitflags::bitflags;
use url::Url;

use crate::error::Error;

bitflags! {
    pub struct SupportedComponents: u8 {
        /// An event, such as a calendar meeting
        const EVENT = 1;
        /// A to-do item, such as a reminder
        const TODO = 2;
    }
}

impl TryFrom<minidom::Element> for SupportedComponents {
    type Error = Error;

    /// Create an instance from an XML <supported-calendar-component-set> element
    fn try_from(element: minidom::Element) -> Result<Self, Self::Error> {
        if element.name() != "supported-calendar-component-set" {
            return Err(Error::Dav("Element must be a <supported-calendar-component-set>".to_string()));
        }

        let mut flags = Self::empty();
        for child in element.children() {
            match child.attr("name") {
                None => continue,
                Some("VEVENT") => flags.insert(Self::EVENT),
                Some("VTODO") => flags.insert(Self::TODO),
                Some(other) => {
                    log::debug!("Unsupported component type: {:?}. Ignoring it", other);
                    continue
                },
            };
        }

        Ok(flags)
    }
}


/// A calendar collection found on the server
#[derive(Clone, Debug, PartialEq)]
pub struct CalendarInfo {
    pub name: String,
    pub url: Url,
    pub supported_components: SupportedComponents,
}

impl CalendarInfo {
    pub fn can_hold_events(&self) -> bool {
        self.supported_components.contains(SupportedComponents::EVENT)
    }
}

/// The calendar called `name`, preferring one that can hold events
pub fn find_by_name<'a>(calendars: &'a [CalendarInfo], name: &str) -> Option<&'a CalendarInfo> {
    let mut matching = calendars.iter().filter(|cal| cal.name == name);
    let first = matching.clone().next();
    matching.find(|cal| cal.can_hold_events()).or(first)
}

/// The calendar to use when the wanted one can neither be found nor created
pub fn fallback(calendars: &[CalendarInfo]) -> Option<&CalendarInfo> {
    calendars.iter()
        .find(|cal| cal.can_hold_events())
        .or_else(|| calendars.first())
}
