//! Response status and headers as built up by a handler.

use http::StatusCode;

use crate::protocol::HeaderTable;

/// The head of a response before it is sent.
///
/// `status` stays `None` until a handler sets one; the writer substitutes
/// `500 Internal Server Error` for an unset status.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    pub status: Option<StatusCode>,
    pub headers: HeaderTable,
}

impl ResponseHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self { status: Some(status), headers: HeaderTable::new() }
    }

    /// The status that will go on the wire.
    pub fn effective_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
