//! An asynchronous HTTP/1.x connection and transaction engine
//!
//! This crate accepts TCP connections, reads HTTP/1.x requests off them,
//! hands each request to a stack of handlers and writes the response back,
//! keeping connections alive between requests when the protocol allows.
//! It is built on top of tokio; every connection is served by its own task.
//!
//! # Features
//!
//! - HTTP/0.9, HTTP/1.0 and HTTP/1.1 requests, including folded header lines
//! - Keep-alive with a per-connection request limit and idle timeout
//! - Chunked responses for HTTP/1.1 clients
//! - `Expect: 100-continue` and `Content-Length` request bodies
//! - Streaming byte ranges out of any seekable reader, optionally rate limited
//! - HTML error pages and a common log format access log
//! - Graceful termination with a bounded grace period
//!
//! # Example
//!
//! ```no_run
//! use abyss_http::handler::{HandlerOutcome, handler_fn};
//! use abyss_http::server::{Server, ServerConfig};
//! use http::StatusCode;
//! use tracing::{Level, error};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let hello = handler_fn(|txn| {
//!         Box::pin(async move {
//!             let body = "Hello World!\r\n";
//!             txn.set_status(StatusCode::OK)?;
//!             txn.set_content_length(body.len() as u64)?;
//!             txn.write_body(body.as_bytes()).await?;
//!             Ok(HandlerOutcome::Handled)
//!         })
//!     });
//!
//!     let config = ServerConfig::builder().name("hello").port(8080).build();
//!     let server = match Server::builder().config(config).handler(hello).build() {
//!         Ok(server) => server,
//!         Err(e) => {
//!             error!(cause = %e, "failed to build server");
//!             return;
//!         }
//!     };
//!
//!     if let Err(e) = server.run().await {
//!         error!(cause = %e, "server stopped");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`server`]: configuration, the accept loop and the keep-alive session
//! - [`connection`]: buffered channel I/O and connection workers
//! - [`codec`]: request head parsing and response encoding
//! - [`transaction`]: one request/response exchange, as seen by handlers
//! - [`handler`]: the handler trait and the stack handlers are tried from
//! - [`protocol`]: methods, versions, headers, ranges, URIs and errors
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: top-level error type
//! - [`protocol::ParseError`]: a request that can't be read; most map to a 4xx status
//! - [`protocol::SendError`]: misuse of the response API or a failed write
//! - [`protocol::ConnError`]: timeouts and closes on the underlying channel
//!
//! # Limitations
//!
//! - HTTP/1.x only; HTTP/2 requests are answered with 505
//! - No TLS support (use a reverse proxy for HTTPS)
//! - A single request line or header line must fit into [`connection::BUFFER_SIZE`] bytes
//! - Request bodies are framed by `Content-Length` only

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod transaction;

mod utils;
pub(crate) use utils::ensure;
