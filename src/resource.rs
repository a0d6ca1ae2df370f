use std::fmt::{Debug, Formatter};

use url::Url;

use crate::error::Result;

/// Just a wrapper around a URL, credentials, and the HTTP client used to reach it
#[derive(Clone)]
pub struct Resource {
    url: Url,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl Resource {
    pub fn new(url: Url, username: String, password: String, http: reqwest::Client) -> Self {
        Self { url, username, password, http }
    }

    pub fn url(&self) -> &Url { &self.url }
    pub fn username(&self) -> &String { &self.username }
    pub fn password(&self) -> &String { &self.password }
    pub fn http(&self) -> &reqwest::Client { &self.http }

    /// Build a new Resource by keeping the same credentials but resolving `href` against this URL.
    ///
    /// `href` can be an absolute path (the usual case in WebDAV replies) or a full URL on another host
    pub fn combine(&self, href: &str) -> Result<Resource> {
        let mut built = self.clone();
        built.url = self.url.join(href.trim())?;
        Ok(built)
    }

    /// Build a new Resource pointing to another URL with the same credentials
    pub fn with_url(&self, url: Url) -> Resource {
        let mut built = self.clone();
        built.url = url;
        built
    }
}

impl Debug for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .finish()
    }
}
