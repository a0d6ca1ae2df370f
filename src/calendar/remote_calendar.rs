use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::calendar::CalendarInfo;
use crate::error::{Error, Result};
use crate::ical::BuiltEvent;
use crate::item::{EventHandle, StoredEvent, VersionTag};
use crate::resource::Resource;
use crate::traits::CalendarStore;
use crate::utils::find_elem;

fn events_body(start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    format!(r#"
    <c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
        <d:prop>
            <d:getetag />
            <c:calendar-data />
        </d:prop>
        <c:filter>
            <c:comp-filter name="VCALENDAR">
                <c:comp-filter name="VEVENT">
                    <c:time-range start="{}" end="{}" />
                </c:comp-filter>
            </c:comp-filter>
        </c:filter>
    </c:calendar-query>
"#, format_dav_time(start), format_dav_time(end))
}

fn format_dav_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}


/// A CalDAV calendar created by a [`Client`](crate::client::Client).
#[derive(Debug)]
pub struct RemoteCalendar {
    name: String,
    resource: Resource,
}

impl RemoteCalendar {
    pub fn new(name: String, resource: Resource) -> Self {
        Self { name, resource }
    }

    pub fn from_info(info: CalendarInfo, base: &Resource) -> Self {
        let resource = base.with_url(info.url);
        Self::new(info.name, resource)
    }

    pub fn url(&self) -> &url::Url { self.resource.url() }

    /// Where a new event with this UID is stored
    fn href_for(&self, uid: &str) -> Result<url::Url> {
        let file_name = format!("{}.ics", sanitize_filename::sanitize(uid));
        let mut url = self.resource.url().clone();
        url.path_segments_mut()
            .map_err(|_| Error::Dav(format!("{} cannot hold events", self.resource.url())))?
            .pop_if_empty()
            .push(&file_name);
        Ok(url)
    }

    async fn put(&self, href: url::Url, event: &BuiltEvent, precondition: Option<(&str, &str)>) -> Result<EventHandle> {
        let mut request = self.resource.http()
            .put(href.clone())
            .header(CONTENT_TYPE, "text/calendar; charset=utf-8")
            .header(CONTENT_LENGTH, event.payload.len())
            .basic_auth(self.resource.username(), Some(self.resource.password()))
            .body(event.payload.clone());
        if let Some((header, value)) = precondition {
            request = request.header(header, value);
        }

        let response = request.send().await?;
        check_status(response.status(), &href)?;

        let etag = match response.headers().get("ETag") {
            None => None,
            Some(etag) => Some(VersionTag::from(etag.to_str()
                .map_err(|err| Error::Dav(format!("invalid ETag for {}: {}", href, err)))?
                .to_string())),
        };
        Ok(EventHandle::new(href, etag))
    }
}

/// Turn a non-successful HTTP status into an error
pub(crate) fn check_status(status: StatusCode, url: &url::Url) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::DavUnauthorized(status.as_u16()));
    }
    if status.is_success() == false {
        return Err(Error::DavStatus { status: status.as_u16(), url: url.to_string() });
    }
    Ok(())
}

/// Extract events from a `REPORT` multistatus body. Responses without calendar data are skipped
pub(crate) fn parse_multistatus(base: &Resource, text: &str) -> Result<Vec<StoredEvent>> {
    let root: minidom::Element = text.parse()?;
    let mut events = Vec::new();
    for response in crate::utils::find_elems(&root, "response") {
        let href = match find_elem(response, "href") {
            None => {
                log::warn!("Unable to extract HREF");
                continue;
            },
            Some(href) => href.text(),
        };
        let url = match base.combine(&href) {
            Err(err) => {
                log::warn!("Invalid HREF {:?} ({}), ignoring it", href, err);
                continue;
            },
            Ok(resource) => resource.url().clone(),
        };

        let payload = match find_elem(response, "calendar-data").map(|data| data.text()) {
            Some(data) if data.trim().is_empty() == false => data,
            _ => {
                log::debug!("No calendar data for {}, ignoring it", url);
                continue;
            },
        };
        let etag = find_elem(response, "getetag")
            .map(|etag| etag.text())
            .filter(|etag| etag.is_empty() == false)
            .map(VersionTag::from);

        events.push(StoredEvent {
            handle: EventHandle::new(url, etag),
            payload,
        });
    }
    Ok(events)
}

#[async_trait]
impl CalendarStore for RemoteCalendar {
    fn name(&self) -> &str { &self.name }

    async fn query_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<StoredEvent>> {
        let text = match crate::client::sub_request(&self.resource, "REPORT", events_body(&start, &end), 1).await {
            Ok(text) => text,
            Err(Error::DavStatus { status, url }) => {
                log::warn!("The server refused to list the events of {} (HTTP {}). Assuming it has none", url, status);
                return Ok(Vec::new());
            },
            Err(err) => return Err(err),
        };

        let events = parse_multistatus(&self.resource, &text)?;
        log::debug!("{} events between {} and {} in {}", events.len(), start, end, self.name);
        Ok(events)
    }

    async fn add(&mut self, event: &BuiltEvent) -> Result<EventHandle> {
        let href = self.href_for(&event.uid)?;
        match self.put(href.clone(), event, Some(("If-None-Match", "*"))).await {
            // The resource exists, but outside of the queried range
            Err(Error::DavStatus { status: 412, .. }) => {
                log::warn!("{} already exists, overwriting it", href);
                self.put(href, event, None).await
            },
            result => result,
        }
    }

    async fn update(&mut self, handle: &EventHandle, event: &BuiltEvent) -> Result<EventHandle> {
        let precondition = handle.etag().map(|etag| ("If-Match", etag.as_str()));
        self.put(handle.href().clone(), event, precondition).await
    }

    async fn delete(&mut self, handle: &EventHandle) -> Result<()> {
        let mut request = self.resource.http()
            .delete(handle.href().clone())
            .basic_auth(self.resource.username(), Some(self.resource.password()));
        if let Some(etag) = handle.etag() {
            request = request.header("If-Match", etag.as_str());
        }

        let del_response = request.send().await?;
        check_status(del_response.status(), handle.href())
    }
}
