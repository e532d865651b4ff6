//! The per-request state handed to handlers.
//!
//! A [`Transaction`] pairs the parsed [`RequestHead`] with a response that is
//! built up and then written through the connection. The response moves
//! through `Unstarted -> HeadersSent -> Ended`; status and headers can only
//! change while it is unstarted.
//!
//! ```no_run
//! # use abyss_http::transaction::Transaction;
//! # use abyss_http::protocol::SendError;
//! # use http::StatusCode;
//! async fn hello(txn: &mut Transaction<'_>) -> Result<(), SendError> {
//!     let body = b"Hello World!\r\n";
//!     txn.set_status(StatusCode::OK)?;
//!     txn.set_content_type(&mime::TEXT_PLAIN_UTF_8)?;
//!     txn.set_content_length(body.len() as u64)?;
//!     txn.write_body(body).await?;
//!     txn.write_end().await
//! }
//! ```

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use mime::Mime;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::codec::Encoder;
use tracing::{debug, trace};

use crate::codec::{HeaderEncoder, PayloadEncoder, UNKNOWN_REASON};
use crate::connection::Connection;
use crate::ensure;
use crate::protocol::{ConnError, HttpVersion, Method, PayloadItem, RequestHead, ResponseHead, SendError};
use crate::server::{DateService, ServerConfig};

/// Value of the `Server` header when advertising is on.
pub const SERVER_SOFTWARE: &str = concat!("abyss-http/", env!("CARGO_PKG_VERSION"));

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseState {
    Unstarted,
    HeadersSent,
    Ended,
}

/// One request and its response on a [`Connection`].
#[derive(Debug)]
pub struct Transaction<'c> {
    conn: &'c mut Connection,
    config: &'c ServerConfig,
    date: &'c DateService,
    request: RequestHead,
    response: ResponseHead,
    state: ResponseState,
    encoder: PayloadEncoder,
    buf: BytesMut,
    chunked_requested: bool,
    keep_alive_allowed: bool,
    keep_alive: bool,
    continue_sent: bool,
    body_consumed: u64,
}

impl<'c> Transaction<'c> {
    /// Wraps a parsed request. `keep_alive_allowed` is the server's half of
    /// the keep-alive decision.
    pub fn new(conn: &'c mut Connection, config: &'c ServerConfig, date: &'c DateService, request: RequestHead, keep_alive_allowed: bool) -> Self {
        Self {
            conn,
            config,
            date,
            request,
            response: ResponseHead::new(),
            state: ResponseState::Unstarted,
            encoder: PayloadEncoder::identity(),
            buf: BytesMut::new(),
            chunked_requested: false,
            keep_alive_allowed,
            keep_alive: false,
            continue_sent: false,
            body_consumed: 0,
        }
    }

    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn uri(&self) -> &str {
        &self.request.uri
    }

    pub fn query(&self) -> Option<&str> {
        self.request.query.as_deref()
    }

    pub fn version(&self) -> HttpVersion {
        self.request.version
    }

    pub fn config(&self) -> &ServerConfig {
        self.config
    }

    /// Records the user a handler authenticated, for the access log.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.request.user = Some(user.into());
    }

    pub fn response(&self) -> &ResponseHead {
        &self.response
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response.status
    }

    pub fn is_started(&self) -> bool {
        self.state != ResponseState::Unstarted
    }

    pub fn is_ended(&self) -> bool {
        self.state == ResponseState::Ended
    }

    fn body_suppressed(&self) -> bool {
        self.request.method == Method::Head || self.response.status.is_some_and(is_bodiless)
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);
        self.response.status = Some(status);
        Ok(())
    }

    /// Appends a response header, keeping earlier ones with the same name.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);
        check_header(name, value)?;
        self.response.headers.add(name, value);
        Ok(())
    }

    /// Sets a response header, replacing all earlier ones with the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);
        check_header(name, value)?;
        self.response.headers.set(name, value);
        Ok(())
    }

    pub fn set_content_length(&mut self, length: u64) -> Result<(), SendError> {
        self.set_header("Content-Length", &length.to_string())
    }

    pub fn set_content_type(&mut self, mime: &Mime) -> Result<(), SendError> {
        self.set_header("Content-Type", mime.as_ref())
    }

    /// Asks for a chunked body. Takes effect only for HTTP/1.1 and later
    /// clients; older ones get an identity body.
    pub fn enable_chunked(&mut self) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);
        self.chunked_requested = true;
        Ok(())
    }

    /// Whether the connection stays open after this response.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Negotiates the connection headers and sends the response head.
    pub async fn write_start(&mut self) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);

        let status = *self.response.status.get_or_insert(StatusCode::INTERNAL_SERVER_ERROR);
        let bodiless = is_bodiless(status);
        let chunked = self.chunked_requested && self.request.version.is_at_least_11() && !bodiless;
        let framed = chunked || bodiless || self.response.headers.contains("Content-Length") || self.request.method == Method::Head;

        self.keep_alive = self.request.keep_alive && self.keep_alive_allowed && status.as_u16() < 400 && framed;

        let headers = &mut self.response.headers;
        if self.keep_alive {
            headers.set("Connection", "Keep-Alive");
            headers.set("Keep-Alive", format!("timeout={}, max={}", self.config.keep_alive_timeout().as_secs(), self.config.keep_alive_max()));
        } else {
            headers.set("Connection", "close");
            headers.remove("Keep-Alive");
        }

        if chunked {
            headers.remove("Content-Length");
            headers.set("Transfer-Encoding", "chunked");
            self.encoder = PayloadEncoder::chunked();
        } else {
            headers.remove("Transfer-Encoding");
        }
        // 304 may carry the length of the representation it stands in for
        if bodiless && status != StatusCode::NOT_MODIFIED {
            headers.remove("Content-Length");
        }

        if status.as_u16() >= 200 {
            headers.set("Date", self.date.current().to_string());
        }

        if self.config.advertise() && !headers.contains("Server") {
            headers.add("Server", SERVER_SOFTWARE);
        }

        HeaderEncoder.encode(&self.response, &mut self.buf)?;
        self.state = ResponseState::HeadersSent;
        trace!(status = status.as_u16(), keep_alive = self.keep_alive, chunked, "response head encoded");
        self.flush().await
    }

    /// Sends a piece of the body, starting the response first if needed.
    ///
    /// Empty pieces are ignored. Bodies of HEAD requests and of 1xx, 204
    /// and 304 responses are discarded.
    pub async fn write_body(&mut self, data: &[u8]) -> Result<(), SendError> {
        if !self.is_started() {
            self.write_start().await?;
        }
        ensure!(!self.is_ended(), SendError::AlreadyEnded);

        if data.is_empty() || self.body_suppressed() {
            return Ok(());
        }

        self.encoder.encode(PayloadItem::Chunk(data), &mut self.buf)?;
        self.flush().await
    }

    /// Finishes the body, starting the response first if needed.
    pub async fn write_end(&mut self) -> Result<(), SendError> {
        if !self.is_started() {
            self.write_start().await?;
        }
        ensure!(!self.is_ended(), SendError::AlreadyEnded);

        if !self.body_suppressed() {
            self.encoder.encode(PayloadItem::<&[u8]>::Eof, &mut self.buf)?;
        }
        self.state = ResponseState::Ended;
        self.flush().await
    }

    /// Sends `len` bytes of `reader` from offset `start` as body, paced to
    /// `rate` bytes per second when given.
    ///
    /// Identity bodies are copied straight from the reader; chunked bodies
    /// go through [`write_body`](Self::write_body) piece by piece.
    pub async fn write_file<R>(&mut self, reader: &mut R, start: u64, len: u64, rate: Option<u64>) -> Result<u64, SendError>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        if !self.is_started() {
            self.write_start().await?;
        }
        ensure!(!self.is_ended(), SendError::AlreadyEnded);

        if self.body_suppressed() || len == 0 {
            return Ok(0);
        }

        if self.encoder.is_chunked() {
            return self.write_file_chunked(reader, start, len).await;
        }

        let chunk = crate::connection::DEFAULT_TRANSFER_CHUNK;
        Ok(self.conn.write_from_reader(reader, start, len, chunk, rate).await?)
    }

    async fn write_file_chunked<R>(&mut self, reader: &mut R, start: u64, len: u64) -> Result<u64, SendError>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        reader.seek(std::io::SeekFrom::Start(start)).await?;
        let mut piece = vec![0u8; crate::connection::DEFAULT_TRANSFER_CHUNK];
        let mut sent = 0u64;
        while sent < len {
            let want = usize::try_from(len - sent).map_or(piece.len(), |remaining| remaining.min(piece.len()));
            let n = reader.read(&mut piece[..want]).await?;
            if n == 0 {
                return Err(SendError::io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)));
            }
            self.write_body(&piece[..n]).await?;
            sent += n as u64;
        }
        Ok(sent)
    }

    /// Sends the interim `100 Continue` response.
    pub async fn write_continue(&mut self) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);
        if self.continue_sent {
            return Ok(());
        }
        self.conn.write(CONTINUE_RESPONSE).await?;
        self.continue_sent = true;
        debug!(peer = %self.conn.peer_addr(), "sent 100 continue");
        Ok(())
    }

    /// Sends a complete HTML error page with `status`.
    ///
    /// `explanation` defaults to the reason phrase.
    pub async fn send_error(&mut self, status: StatusCode, explanation: Option<&str>) -> Result<(), SendError> {
        ensure!(!self.is_started(), SendError::AlreadyStarted);

        let page = error_page(status, explanation, self.config.advertise());
        self.response.status = Some(status);
        self.chunked_requested = false;
        self.set_content_type(&mime::TEXT_HTML_UTF_8)?;
        self.set_content_length(page.len() as u64)?;
        self.write_body(page.as_bytes()).await?;
        self.write_end().await
    }

    /// Request body bytes already buffered.
    pub fn bytes_available(&self) -> usize {
        let buffered = self.conn.bytes_available() as u64;
        usize::try_from(buffered.min(self.body_remaining())).unwrap_or(usize::MAX)
    }

    /// Announced request body bytes not yet taken.
    pub fn body_remaining(&self) -> u64 {
        self.request.content_length().unwrap_or(0).saturating_sub(self.body_consumed)
    }

    /// Waits up to `timeout` for more request body bytes.
    ///
    /// Sends `100 Continue` first if the client asked for it and nothing has
    /// been sent yet.
    pub async fn read_body(&mut self, timeout: Duration) -> Result<usize, ConnError> {
        if self.request.continue_required && !self.continue_sent && !self.is_started() {
            self.write_continue().await.map_err(|e| match e {
                SendError::Connection { source } => source,
                other => ConnError::io(std::io::Error::other(other.to_string())),
            })?;
        }
        self.conn.read(timeout).await
    }

    /// Takes up to `max` buffered body bytes.
    pub fn take_body(&mut self, max: usize) -> Bytes {
        let n = max.min(self.bytes_available());
        let taken = self.conn.take(n);
        self.body_consumed += taken.len() as u64;
        taken
    }

    /// Reads the whole `Content-Length` body, each read bounded by `timeout`.
    pub async fn read_to_end(&mut self, timeout: Duration) -> Result<Bytes, ConnError> {
        let mut body = BytesMut::new();
        loop {
            body.extend_from_slice(&self.take_body(usize::MAX));
            if self.body_remaining() == 0 {
                return Ok(body.freeze());
            }
            self.read_body(timeout).await?;
        }
    }

    /// Settles the keep-alive decision once the handler is done.
    ///
    /// Unread request body bytes would be parsed as the next request, so a
    /// partially read body closes the connection.
    pub fn finish(&mut self) -> bool {
        if self.keep_alive && (self.body_remaining() > 0 || self.request.headers.contains("transfer-encoding")) {
            debug!(peer = %self.conn.peer_addr(), "request body left unread, closing after response");
            self.keep_alive = false;
        }
        self.keep_alive && self.is_ended()
    }

    /// A Common Log Format line for this transaction.
    pub fn log_entry(&self) -> String {
        format!(
            "{} - {} [{}] \"{}\" {} {}",
            self.conn.peer_addr().ip(),
            self.request.user.as_deref().unwrap_or("-"),
            self.date.current(),
            self.request.request_line,
            self.response.effective_status().as_u16(),
            self.conn.out_bytes(),
        )
    }

    async fn flush(&mut self) -> Result<(), SendError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.conn.write(&self.buf).await;
        self.buf.clear();
        Ok(result?)
    }
}

/// 1xx, 204 and 304 responses never carry a body.
fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

fn check_header(name: &str, value: &str) -> Result<(), SendError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| SendError::invalid_header(format!("name {name:?}: {e}")))?;
    HeaderValue::from_str(value).map_err(|e| SendError::invalid_header(format!("value of {name}: {e}")))?;
    Ok(())
}

fn error_page(status: StatusCode, explanation: Option<&str>, advertise: bool) -> String {
    let reason = status.canonical_reason().unwrap_or(UNKNOWN_REASON);
    let explanation = escape_html(explanation.unwrap_or(reason));
    let footer = if advertise { format!("<hr />\n<address>{SERVER_SOFTWARE}</address>\n") } else { String::new() };

    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n<body>\n<h1>{code} {reason}</h1>\n<p>{explanation}</p>\n{footer}</body>\n</html>\n",
        code = status.as_u16(),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
