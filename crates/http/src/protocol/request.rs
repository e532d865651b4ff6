//! Parsed request state.
//!
//! A [`RequestHead`] is filled in by the request parser and then owned by the
//! [`Transaction`](crate::transaction::Transaction) serving it. Handlers only
//! read it, apart from the authenticated user.

use crate::protocol::{HeaderTable, HttpVersion, Method, RangeSpec};

/// Everything the engine learned from a request line and its headers.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub(crate) method: Method,
    pub(crate) request_line: String,
    pub(crate) uri: String,
    pub(crate) query: Option<String>,
    pub(crate) host: Option<String>,
    pub(crate) port: u16,
    pub(crate) version: HttpVersion,
    pub(crate) headers: HeaderTable,
    pub(crate) cookies: Vec<String>,
    pub(crate) ranges: Vec<RangeSpec>,
    pub(crate) from: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) referer: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) keep_alive: bool,
    pub(crate) continue_required: bool,
}

impl Default for RequestHead {
    fn default() -> Self {
        Self {
            method: Method::Unknown,
            request_line: String::new(),
            uri: String::new(),
            query: None,
            host: None,
            port: crate::protocol::DEFAULT_PORT,
            version: HttpVersion::HTTP_09,
            headers: HeaderTable::new(),
            cookies: Vec::new(),
            ranges: Vec::new(),
            from: None,
            user_agent: None,
            referer: None,
            user: None,
            keep_alive: false,
            continue_required: false,
        }
    }
}

impl RequestHead {
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request line exactly as received, without its line terminator.
    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    /// Percent-decoded path, or `*`.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Raw query string, not decoded.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    /// Shorthand for a lookup in [`headers`](Self::headers); `name` is
    /// matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    pub fn ranges(&self) -> &[RangeSpec] {
        &self.ranges
    }

    /// Value of the `From` header.
    pub fn from_header(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }

    /// User name a handler attached after authenticating the request.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Whether the client asked to keep the connection open.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Whether the client sent `Expect: 100-continue`.
    pub fn continue_required(&self) -> bool {
        self.continue_required
    }

    /// A request without a version token carries no headers and no body.
    pub fn is_legacy(&self) -> bool {
        self.version == HttpVersion::HTTP_09
    }

    /// Announced body length, if the request carries a valid `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.headers.get("content-length").and_then(|value| value.trim().parse().ok())
    }
}
