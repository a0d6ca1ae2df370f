//! Events as they are stored in a calendar

use std::fmt::{Display, Formatter};

use url::Url;


/// A VersionTag is basically a CalDAV `etag`. Whenever it changes, this means the data has changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionTag {
    tag: String
}

impl From<String> for VersionTag {
    fn from(tag: String) -> VersionTag {
        Self { tag }
    }
}

impl VersionTag {
    /// Get the inner version tag (usually a WebDAV `etag`)
    pub fn as_str(&self) -> &str {
        &self.tag
    }
}


/// Opaque address of a stored event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventHandle {
    href: Url,
    etag: Option<VersionTag>,
}

impl EventHandle {
    pub fn new(href: Url, etag: Option<VersionTag>) -> Self {
        Self { href, etag }
    }

    pub fn href(&self) -> &Url { &self.href }
    pub fn etag(&self) -> Option<&VersionTag> { self.etag.as_ref() }
}

impl Display for EventHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.href)
    }
}


/// An event as returned by a calendar query
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEvent {
    pub handle: EventHandle,
    /// The raw iCal payload
    pub payload: String,
}
