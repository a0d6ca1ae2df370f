//! This module provides a client for the WebUntis JSON-RPC API
//!
//! It only reads: it logs in, finds out whose timetable it should read, and returns lessons.

mod model;
pub mod rpc;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::config::{UntisSettings, CLIENT_NAME};
use crate::error::{Error, Result};
use crate::lesson::Lesson;
use crate::traits::{Person, TimetableSource};
use crate::window::date_as_int;
use model::{RawLesson, Session, UserData};
use rpc::{Request, RpcOutcome};

/// Current name of the user data method
pub const USER_DATA_METHOD: &str = "getUserData2017";
/// Name of the user data method on servers that do not know [`USER_DATA_METHOD`]
pub const LEGACY_USER_DATA_METHOD: &str = "getUserData";

const LABEL_FIELDS: [&str; 3] = ["id", "name", "longname"];


/// A timetable source that fetches its data from a WebUntis server
pub struct UntisClient {
    http: reqwest::Client,
    endpoint: Url,
    settings: UntisSettings,
    session_id: Option<String>,
}

impl UntisClient {
    /// Create a client. This does not start a connection
    pub fn new(settings: &UntisSettings, timeout: Duration) -> Result<Self> {
        let mut endpoint = Url::parse(&format!("https://{}/WebUntis/jsonrpc.do", settings.server))?;
        endpoint.query_pairs_mut().append_pair("school", &settings.school);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            settings: settings.clone(),
            session_id: None,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Value) -> Result<RpcOutcome> {
        log::trace!("Calling {}", method);
        let mut request = self.http
            .post(self.endpoint.clone())
            .header(USER_AGENT, format!("{}/{}", CLIENT_NAME, env!("CARGO_PKG_VERSION")))
            .json(&Request::new(method, params));
        if let Some(session_id) = &self.session_id {
            request = request.header(COOKIE, format!("JSESSIONID={}; schoolname={}", session_id, self.settings.school));
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.text().await?;
        RpcOutcome::from_body(&body)
    }

    async fn login(&mut self) -> Result<()> {
        if self.session_id.is_some() {
            return Ok(());
        }
        log::info!("Logging in to {} (school {})", self.settings.server, self.settings.school);

        let params = json!({
            "user": self.settings.username,
            "password": self.settings.password,
            "client": CLIENT_NAME,
        });
        let session: Session = match self.call("authenticate", params).await? {
            RpcOutcome::Success(result) => serde_json::from_value(result)
                .map_err(|err| Error::SourceProtocol(format!("unexpected login response: {}", err)))?,
            RpcOutcome::MethodNotFound(err) | RpcOutcome::Failed(err) => {
                return Err(Error::SourceAuth(err.to_string()));
            },
        };

        self.session_id = Some(session.session_id);
        Ok(())
    }

    /// End the current session, if any
    pub async fn logout(&mut self) -> Result<()> {
        if self.session_id.is_none() {
            return Ok(());
        }
        let outcome = self.call("logout", json!({})).await;
        self.session_id = None;
        match outcome? {
            RpcOutcome::Success(_) => Ok(()),
            RpcOutcome::MethodNotFound(err) | RpcOutcome::Failed(err) => {
                Err(Error::SourceProtocol(format!("logout failed: {}", err)))
            },
        }
    }
}

#[async_trait]
impl TimetableSource for UntisClient {
    async fn current_person(&mut self) -> Result<Person> {
        self.login().await?;

        let this = &*self;
        let user_data: UserData = with_legacy_fallback(USER_DATA_METHOD, LEGACY_USER_DATA_METHOD, |method| {
            this.call(method, json!({}))
        }).await?;
        let person = Person::from(user_data);
        log::debug!("Timetable owner is element {} of type {}", person.id, person.kind);
        Ok(person)
    }

    async fn fetch_lessons(&mut self, person: &Person, start: NaiveDate, end: NaiveDate) -> Result<Vec<Lesson>> {
        self.login().await?;

        let params = json!({
            "options": {
                "element": { "id": person.id, "type": person.kind },
                "startDate": date_as_int(start),
                "endDate": date_as_int(end),
                "showStudentgroup": true,
                "klasseFields": LABEL_FIELDS,
                "teacherFields": LABEL_FIELDS,
                "subjectFields": LABEL_FIELDS,
                "roomFields": LABEL_FIELDS,
            }
        });

        let result = match self.call("getTimetable", params).await? {
            RpcOutcome::Success(result) => result,
            RpcOutcome::MethodNotFound(err) | RpcOutcome::Failed(err) => {
                return Err(Error::SourceProtocol(format!("getTimetable failed: {}", err)));
            },
        };

        let raw: Vec<RawLesson> = serde_json::from_value(result)
            .map_err(|err| Error::SourceProtocol(format!("unexpected timetable: {}", err)))?;
        Ok(raw.into_iter().map(Lesson::from).collect())
    }
}

/// Calls `current`, and `legacy` once if the server does not know `current` or answers it with an unexpected shape
pub(crate) async fn with_legacy_fallback<'m, T, F, Fut>(current: &'m str, legacy: &'m str, mut call: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnMut(&'m str) -> Fut,
    Fut: Future<Output = Result<RpcOutcome>>,
{
    match call(current).await? {
        RpcOutcome::Success(result) => match serde_json::from_value(result) {
            Ok(decoded) => return Ok(decoded),
            Err(err) => log::warn!("Unexpected answer to {} ({}). Using {} instead", current, err, legacy),
        },
        RpcOutcome::Failed(err) => return Err(Error::SourceProtocol(format!("{} failed: {}", current, err))),
        RpcOutcome::MethodNotFound(err) => {
            log::info!("The server does not support {} ({}). Using {} instead", current, err, legacy);
        },
    }

    match call(legacy).await? {
        RpcOutcome::Success(result) => serde_json::from_value(result)
            .map_err(|err| Error::SourceProtocol(format!("unexpected answer to {}: {}", legacy, err))),
        RpcOutcome::MethodNotFound(err) | RpcOutcome::Failed(err) => {
            Err(Error::SourceProtocol(format!("{} failed: {}", legacy, err)))
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use rpc::RpcError;

    fn not_found() -> RpcOutcome {
        RpcOutcome::MethodNotFound(RpcError { code: rpc::METHOD_NOT_FOUND, message: "Method not found".into(), data: None })
    }

    fn failed() -> RpcOutcome {
        RpcOutcome::Failed(RpcError { code: -8520, message: "not authenticated".into(), data: None })
    }

    async fn run<T: DeserializeOwned>(answers: Vec<RpcOutcome>) -> (Result<T>, Vec<String>) {
        let answers = RefCell::new(answers.into_iter());
        let calls = RefCell::new(Vec::new());
        let result = with_legacy_fallback("current", "legacy", |method| {
            calls.borrow_mut().push(method.to_string());
            let answer = answers.borrow_mut().next().expect("unexpected call");
            async move { Ok::<RpcOutcome, Error>(answer) }
        }).await;
        (result, calls.into_inner())
    }

    #[tokio::test]
    async fn current_method_is_used_when_supported() {
        let (result, calls) = run::<Value>(vec![RpcOutcome::Success(json!(1))]).await;
        assert_eq!(result.unwrap(), json!(1));
        assert_eq!(calls, vec!["current"]);
    }

    #[tokio::test]
    async fn legacy_method_is_tried_once() {
        let (result, calls) = run::<Value>(vec![not_found(), RpcOutcome::Success(json!(2))]).await;
        assert_eq!(result.unwrap(), json!(2));
        assert_eq!(calls, vec!["current", "legacy"]);

        let (result, calls) = run::<Value>(vec![not_found(), not_found()]).await;
        assert!(matches!(result, Err(Error::SourceProtocol(_))));
        assert_eq!(calls, vec!["current", "legacy"]);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let (result, calls) = run::<Value>(vec![failed()]).await;
        match result {
            Err(Error::SourceProtocol(msg)) => assert!(msg.contains("not authenticated")),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(calls, vec!["current"]);
    }

    #[tokio::test]
    async fn badly_shaped_answers_fall_back_to_the_legacy_method() {
        let odd = RpcOutcome::Success(json!({"elemId": "eighteen", "elemType": 5}));
        let legacy = RpcOutcome::Success(json!({"personId": 17, "personType": 5}));
        let (result, calls) = run::<UserData>(vec![odd, legacy]).await;
        assert_eq!(result.unwrap().person_id, 17);
        assert_eq!(calls, vec!["current", "legacy"]);

        let odd = || RpcOutcome::Success(json!({"elemId": "eighteen", "elemType": 5}));
        let (result, calls) = run::<UserData>(vec![odd(), odd()]).await;
        match result {
            Err(Error::SourceProtocol(msg)) => assert!(msg.contains("legacy")),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(calls, vec!["current", "legacy"]);
    }

    #[test]
    fn endpoint_carries_the_school() {
        let settings = UntisSettings {
            server: "poly.webuntis.com".into(),
            school: "August Bebel Schule".into(),
            username: "u".into(),
            password: "p".into(),
        };
        let client = UntisClient::new(&settings, Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://poly.webuntis.com/WebUntis/jsonrpc.do?school=August+Bebel+Schule");
        assert_eq!(date_as_int(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()), 20240305);
    }
}
