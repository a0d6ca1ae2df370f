//! This module provides a client to connect to a CalDAV server

use std::convert::TryFrom;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use minidom::Element;
use url::Url;

use crate::calendar::remote_calendar::{check_status, RemoteCalendar};
use crate::calendar::{CalendarInfo, SupportedComponents};
use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::utils::{find_elem, find_elems};


static DAVCLIENT_BODY: &str = r#"
    <d:propfind xmlns:d="DAV:">
       <d:prop>
           <d:current-user-principal />
       </d:prop>
    </d:propfind>
"#;

static HOMESET_BODY: &str = r#"
    <d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" >
      <d:self/>
      <d:prop>
        <c:calendar-home-set />
      </d:prop>
    </d:propfind>
"#;

static CAL_BODY: &str = r#"
    <d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" >
       <d:prop>
         <d:displayname />
         <d:resourcetype />
         <c:supported-calendar-component-set />
       </d:prop>
    </d:propfind>
"#;

static DAV_NS: &str = "DAV:";
static CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

fn mkcalendar_body(name: &str) -> String {
    let body = Element::builder("mkcalendar", CALDAV_NS)
        .append(Element::builder("set", DAV_NS)
            .append(Element::builder("prop", DAV_NS)
                .append(Element::builder("displayname", DAV_NS).append(name))
                .append(Element::builder("supported-calendar-component-set", CALDAV_NS)
                    .append(Element::builder("comp", CALDAV_NS).attr("name", "VEVENT")))))
        .build();
    String::from(&body)
}


/// Send a WebDAV request and return the body of the answer.
///
/// Non-successful statuses are turned into errors (see [`check_status`])
pub(crate) async fn sub_request(resource: &Resource, method: &str, body: String, depth: u32) -> Result<String> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|err| Error::Dav(format!("invalid method {}: {}", method, err)))?;

    let res = resource.http()
        .request(method, resource.url().clone())
        .header("Depth", depth)
        .header(CONTENT_TYPE, "application/xml")
        .basic_auth(resource.username(), Some(resource.password()))
        .body(body)
        .send()
        .await?;

    check_status(res.status(), resource.url())?;
    let text = res.text().await?;
    Ok(text)
}

/// Follow `items` down from the root of a `PROPFIND` answer and return the text of the last one
async fn sub_request_and_extract_elem(resource: &Resource, body: String, items: &[&str]) -> Result<String> {
    let text = sub_request(resource, "PROPFIND", body, 0).await?;
    let root: Element = text.parse()?;
    extract_text(&root, items)
        .ok_or_else(|| Error::Dav(format!("no <{}> in the answer from {}", items.join(">/<"), resource.url())))
}

fn extract_text(root: &Element, items: &[&str]) -> Option<String> {
    let mut current_element = root;
    for item in items {
        current_element = find_elem(current_element, item)?;
    }
    Some(current_element.text().trim().to_string())
}

/// Extract the calendar collections of a `PROPFIND` answer on a calendar home set
pub(crate) fn parse_calendars(base: &Resource, text: &str) -> Result<Vec<CalendarInfo>> {
    let root: Element = text.parse()?;
    let mut calendars = Vec::new();

    for rep in find_elems(&root, "response") {
        let display_name = find_elem(rep, "displayname").map(|e| e.text()).unwrap_or_else(|| "<no name>".to_string());
        log::debug!("Considering calendar {}", display_name);

        // We filter out non-calendar items
        let resource_types = match find_elem(rep, "resourcetype") {
            None => continue,
            Some(rt) => rt,
        };
        if resource_types.children().any(|rt| rt.name() == "calendar") == false {
            continue;
        }

        // We filter out the root calendar collection, that has an empty supported-calendar-component-set
        let el_supported_comps = match find_elem(rep, "supported-calendar-component-set") {
            None => continue,
            Some(comps) => comps,
        };
        if el_supported_comps.children().count() == 0 {
            continue;
        }

        let calendar_href = match find_elem(rep, "href") {
            None => {
                log::warn!("Calendar {} has no URL! Ignoring it.", display_name);
                continue;
            },
            Some(h) => h.text(),
        };
        let url = match base.combine(&calendar_href) {
            Err(err) => {
                log::warn!("Calendar {} has an invalid URL ({})! Ignoring it.", display_name, err);
                continue;
            },
            Ok(resource) => resource.url().clone(),
        };

        let supported_components = match SupportedComponents::try_from(el_supported_comps.clone()) {
            Err(err) => {
                log::warn!("Calendar {} has invalid supported components ({})! Ignoring it.", display_name, err);
                continue;
            },
            Ok(sc) => sc,
        };

        log::debug!("Found calendar {}", display_name);
        calendars.push(CalendarInfo { name: display_name, url, supported_components });
    }

    Ok(calendars)
}


/// A CalDAV client that discovers (and creates) the calendars of an account
pub struct Client {
    resource: Resource,

    principal: Option<Url>,
    calendar_home_set: Option<Url>,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<T: ToString, U: ToString>(url: Url, username: T, password: U, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self{
            resource: Resource::new(url, username.to_string(), password.to_string(), http),
            principal: None,
            calendar_home_set: None,
        })
    }

    /// Returns the URL and credentials of this client
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Return the Principal URL, or fetch it from server if not known yet
    async fn get_principal(&mut self) -> Result<Url> {
        if let Some(p) = &self.principal {
            return Ok(p.clone());
        }

        let href = sub_request_and_extract_elem(&self.resource, DAVCLIENT_BODY.into(), &["current-user-principal", "href"]).await?;
        let principal_url = self.resource.combine(&href)?.url().clone();
        self.principal = Some(principal_url.clone());
        log::debug!("Principal URL is {}", principal_url);

        Ok(principal_url)
    }

    /// Return the Homeset URL, or fetch it from server if not known yet
    async fn get_cal_home_set(&mut self) -> Result<Url> {
        if let Some(h) = &self.calendar_home_set {
            return Ok(h.clone());
        }
        let principal_url = self.get_principal().await?;
        let principal = self.resource.with_url(principal_url);

        let href = sub_request_and_extract_elem(&principal, HOMESET_BODY.into(), &["calendar-home-set", "href"]).await?;
        let chs_url = principal.combine(&href)?.url().clone();
        self.calendar_home_set = Some(chs_url.clone());
        log::debug!("Calendar home set URL is {}", chs_url);

        Ok(chs_url)
    }

    /// Return the calendars of this account, in the order the server lists them
    pub async fn get_calendars(&mut self) -> Result<Vec<CalendarInfo>> {
        let home_set_url = self.get_cal_home_set().await?;
        let home_set = self.resource.with_url(home_set_url);
        let text = sub_request(&home_set, "PROPFIND", CAL_BODY.into(), 1).await?;
        parse_calendars(&home_set, &text)
    }

    /// Create a calendar that holds events under the calendar home set
    pub async fn create_calendar(&mut self, name: &str) -> Result<CalendarInfo> {
        let home_set_url = self.get_cal_home_set().await?;
        let home_set = self.resource.with_url(home_set_url);
        let new_calendar = home_set.combine(&format!("{}/", uuid::Uuid::new_v4()))?;

        sub_request(&new_calendar, "MKCALENDAR", mkcalendar_body(name), 0).await?;
        log::info!("Created calendar {} at {}", name, new_calendar.url());

        Ok(CalendarInfo {
            name: name.to_string(),
            url: new_calendar.url().clone(),
            supported_components: SupportedComponents::EVENT,
        })
    }

    /// Returns the calendar named `name`, creating it if needed.
    ///
    /// When it can neither be found nor created, another calendar of the account is used instead
    pub async fn find_or_create_calendar(&mut self, name: &str) -> Result<RemoteCalendar> {
        let calendars = self.get_calendars().await?;
        if let Some(found) = crate::calendar::find_by_name(&calendars, name) {
            log::info!("Using calendar {} ({})", found.name, found.url);
            return Ok(RemoteCalendar::from_info(found.clone(), &self.resource));
        }

        log::info!("No calendar named {}, creating it", name);
        let created = self.create_calendar(name).await;
        let chosen = created_or_fallback(&calendars, name, created)?;
        Ok(RemoteCalendar::from_info(chosen, &self.resource))
    }
}

/// The calendar to use once creating `name` has been attempted
pub(crate) fn created_or_fallback(calendars: &[CalendarInfo], name: &str, created: Result<CalendarInfo>) -> Result<CalendarInfo> {
    let create_error = match created {
        Ok(created) => return Ok(created),
        Err(err) => err,
    };

    match crate::calendar::fallback(calendars) {
        None => {
            log::error!("Unable to create calendar {}: {}", name, create_error);
            Err(Error::NoCalendar)
        },
        Some(other) => {
            log::warn!("Unable to create calendar {} ({}). Using {} instead", name, create_error, other.name);
            Ok(other.clone())
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const HOME_SET_REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:">
  <response>
    <href>/123456/calendars/</href>
    <propstat><prop>
      <resourcetype><collection/></resourcetype>
      <supported-calendar-component-set xmlns="urn:ietf:params:xml:ns:caldav"/>
    </prop><status>HTTP/1.1 200 OK</status></propstat>
  </response>
  <response>
    <href>/123456/calendars/tasks/</href>
    <propstat><prop>
      <displayname>Reminders</displayname>
      <resourcetype><collection/><calendar xmlns="urn:ietf:params:xml:ns:caldav"/></resourcetype>
      <supported-calendar-component-set xmlns="urn:ietf:params:xml:ns:caldav"><comp name="VTODO"/></supported-calendar-component-set>
    </prop><status>HTTP/1.1 200 OK</status></propstat>
  </response>
  <response>
    <href>https://p12-caldav.icloud.com/123456/calendars/home/</href>
    <propstat><prop>
      <displayname>Home</displayname>
      <resourcetype><collection/><calendar xmlns="urn:ietf:params:xml:ns:caldav"/></resourcetype>
      <supported-calendar-component-set xmlns="urn:ietf:params:xml:ns:caldav"><comp name="VEVENT"/></supported-calendar-component-set>
    </prop><status>HTTP/1.1 200 OK</status></propstat>
  </response>
  <response>
    <href>/123456/inbox/</href>
    <propstat><prop>
      <displayname>Inbox</displayname>
      <resourcetype><collection/><schedule-inbox xmlns="urn:ietf:params:xml:ns:caldav"/></resourcetype>
    </prop><status>HTTP/1.1 200 OK</status></propstat>
  </response>
</multistatus>"#;

    fn home_set() -> Resource {
        Resource::new(
            "https://p12-caldav.icloud.com/123456/calendars/".parse().unwrap(),
            "me".into(), "secret".into(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn calendars_are_listed_in_server_order() {
        let calendars = parse_calendars(&home_set(), HOME_SET_REPLY).unwrap();
        let names: Vec<&str> = calendars.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Reminders", "Home"]);

        assert_eq!(calendars[0].url.as_str(), "https://p12-caldav.icloud.com/123456/calendars/tasks/");
        assert_eq!(calendars[0].can_hold_events(), false);
        assert_eq!(calendars[1].url.as_str(), "https://p12-caldav.icloud.com/123456/calendars/home/");
        assert!(calendars[1].can_hold_events());
    }

    #[test]
    fn nested_elements_are_extracted() {
        let root: Element = r#"<d:multistatus xmlns:d="DAV:"><d:response><d:propstat><d:prop>
            <d:current-user-principal><d:href> /123456/principal/ </d:href></d:current-user-principal>
        </d:prop></d:propstat></d:response></d:multistatus>"#.parse().unwrap();

        assert_eq!(extract_text(&root, &["current-user-principal", "href"]), Some("/123456/principal/".to_string()));
        assert_eq!(extract_text(&root, &["calendar-home-set", "href"]), None);
    }

    #[test]
    fn calendar_names_are_escaped_on_creation() {
        let body = mkcalendar_body("Maths & <Co>");
        assert!(body.contains("Maths &amp; &lt;Co"));
        assert!(body.contains("& <Co>") == false);

        let root: Element = body.parse().unwrap();
        assert_eq!(root.name(), "mkcalendar");
        assert_eq!(extract_text(&root, &["set", "prop", "displayname"]), Some("Maths & <Co>".to_string()));
        let comp = find_elem(&root, "comp").unwrap();
        assert_eq!(comp.attr("name"), Some("VEVENT"));
        assert_eq!(comp.ns(), "urn:ietf:params:xml:ns:caldav");
    }

    fn info(name: &str, comps: SupportedComponents) -> CalendarInfo {
        CalendarInfo {
            name: name.to_string(),
            url: format!("https://p12-caldav.icloud.com/123456/calendars/{}/", name.to_lowercase()).parse().unwrap(),
            supported_components: comps,
        }
    }

    #[test]
    fn created_calendars_are_used() {
        let existing = vec![info("Home", SupportedComponents::EVENT)];
        let chosen = created_or_fallback(&existing, "Stundenplan", Ok(info("Stundenplan", SupportedComponents::EVENT))).unwrap();
        assert_eq!(chosen.name, "Stundenplan");
    }

    #[test]
    fn failed_creations_fall_back_to_another_calendar() {
        let existing = vec![
            info("Reminders", SupportedComponents::TODO),
            info("Home", SupportedComponents::EVENT),
        ];
        let chosen = created_or_fallback(&existing, "Stundenplan", Err(Error::DavStatus { status: 403, url: "https://p12-caldav.icloud.com/".to_string() })).unwrap();
        assert_eq!(chosen.name, "Home");
    }

    #[test]
    fn failed_creations_without_any_calendar_are_errors() {
        let result = created_or_fallback(&[], "Stundenplan", Err(Error::Dav("MKCALENDAR refused".to_string())));
        match result {
            Err(Error::NoCalendar) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
