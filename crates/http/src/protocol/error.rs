use std::io;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("connection error: {source}")]
    ConnectionError {
        #[from]
        source: ConnError,
    },
}

/// Failures of the buffered channel underneath a [`Connection`](crate::connection::Connection).
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("timed out waiting for the peer")]
    Timeout,

    #[error("connection closed by peer")]
    Closed,

    #[error("read buffer is full, capacity {capacity}")]
    BufferFull { capacity: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ConnError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("invalid http version: {0}")]
    InvalidVersion(String),

    #[error("invalid request uri: {reason}")]
    InvalidUri { reason: String },

    #[error("unsupported uri form: {0}")]
    UnsupportedUriForm(String),

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("line exceeds the read buffer capacity {max_size}")]
    LineTooLong { max_size: usize },

    #[error("timed out reading the request")]
    Timeout,

    #[error("connection failure: {source}")]
    Connection { source: ConnError },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_range<S: ToString>(str: S) -> Self {
        Self::InvalidRange { reason: str.to_string() }
    }

    /// The status the engine answers with, or `None` when the channel itself
    /// failed and no response can be attempted.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ParseError::Timeout => Some(StatusCode::REQUEST_TIMEOUT),
            ParseError::Connection { .. } => None,
            _ => Some(StatusCode::BAD_REQUEST),
        }
    }
}

impl From<ConnError> for ParseError {
    fn from(e: ConnError) -> Self {
        match e {
            ConnError::Timeout => ParseError::Timeout,
            ConnError::BufferFull { capacity } => ParseError::LineTooLong { max_size: capacity },
            source => ParseError::Connection { source },
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("response already started, status and headers are frozen")]
    AlreadyStarted,

    #[error("response already ended")]
    AlreadyEnded,

    #[error("invalid response header: {reason}")]
    InvalidHeader { reason: String },

    #[error("connection failure: {source}")]
    Connection {
        #[from]
        source: ConnError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
