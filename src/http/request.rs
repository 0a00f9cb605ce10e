//! Http request.

use std::collections::HashMap;

use url::Url;

use super::{Headers, Version};
use crate::error::MessageError;
use crate::message::{Body, RequestHead};

/// Decoded request.
///
/// The URI only changes through [`rewrite`](Self::rewrite). Passed values
/// are out-of-band data set by matchers and filters, they never appear
/// on the wire.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    url: Url,
    version: Version,
    headers: Headers,
    passed: HashMap<String, String>,
    body: Option<Body>,
}

fn resolve(target: &str, host: &str) -> Result<Url, MessageError> {
    // authority only, the path comes from the request line
    if host
        .bytes()
        .any(|b| matches!(b, b'/' | b'?' | b'#' | b'@' | b'\\') || b.is_ascii_whitespace())
    {
        return Err(MessageError::Host);
    }
    let mut url = Url::parse(&format!("http://{}/", host))?;

    if target.starts_with('/') {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        url.set_path(path);
        url.set_query(query);
        Ok(url)
    } else if target.contains("://") {
        // absolute-form
        Ok(Url::parse(target)?)
    } else {
        // authority-form or asterisk-form
        Ok(url)
    }
}

impl Request {
    /// Constructor, HTTP/1.1 request for `localhost` without headers.
    pub fn new(method: &str, target: &str) -> Result<Self, MessageError> {
        Self::from_head(
            RequestHead {
                method: method.to_string(),
                target: target.to_string(),
                version: Version::Http11,
                headers: Headers::new(),
            },
            "localhost",
        )
    }

    /// Build from a decoded head.
    ///
    /// The `Host` header names the authority, `default_host` is used when
    /// it is absent. A `Host` carrying anything besides host and port is
    /// refused.
    pub fn from_head(head: RequestHead, default_host: &str) -> Result<Self, MessageError> {
        let host = head
            .headers
            .first("host")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(default_host);
        let url = resolve(&head.target, host)?;

        Ok(Self {
            method: head.method,
            url,
            version: head.version,
            headers: head.headers,
            passed: HashMap::new(),
            body: None,
        })
    }

    /// Builder style, replace the version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Builder style, add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Builder style, attach a body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::new(body.into()));
        self
    }

    #[inline]
    pub fn method(&self) -> &str { &self.method }

    #[inline]
    pub const fn version(&self) -> Version { self.version }

    #[inline]
    pub fn url(&self) -> &Url { &self.url }

    /// Full URI, scheme and host included.
    #[inline]
    pub fn uri(&self) -> &str { self.url.as_str() }

    #[inline]
    pub fn path(&self) -> &str { self.url.path() }

    #[inline]
    pub fn query(&self) -> Option<&str> { self.url.query() }

    /// Path and query, as sent on the request line.
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }

    /// Decoded query parameters.
    pub fn params(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned()))
    }

    /// Header value, repeated headers joined with `", "`.
    #[inline]
    pub fn header(&self, name: &str) -> Option<String> { self.headers.get(name) }

    #[inline]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// Point the request at another URI, relative to the current one.
    pub fn rewrite(&mut self, uri: &str) -> Result<(), url::ParseError> {
        self.url = self.url.join(uri)?;
        Ok(())
    }

    /// Out-of-band value set by a matcher or filter.
    #[inline]
    pub fn passed(&self, name: &str) -> Option<&str> { self.passed.get(name).map(String::as_str) }

    #[inline]
    pub fn passed_values(&self) -> &HashMap<String, String> { &self.passed }

    /// Attach an out-of-band value.
    pub fn pass(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.passed.insert(name.into(), value.into());
    }

    /// Body, `None` if the request has neither `Content-Length` nor
    /// chunked `Transfer-Encoding`.
    #[inline]
    pub fn body(&self) -> Option<&Body> { self.body.as_ref() }

    #[inline]
    pub fn body_mut(&mut self) -> Option<&mut Body> { self.body.as_mut() }

    #[inline]
    pub fn set_body(&mut self, body: Option<Body>) { self.body = body; }

    /// Whether the client asks to keep the connection open.
    ///
    /// HTTP/1.1 stays open unless `Connection: close`, HTTP/1.0 closes
    /// unless `Connection: keep-alive`.
    pub fn wants_keep_alive(&self) -> bool {
        if self.version.keeps_alive() {
            !self.headers.has_token("connection", "close")
        } else {
            self.headers.has_token("connection", "keep-alive")
        }
    }
}
