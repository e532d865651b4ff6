//! Wire formats: reading request heads and writing responses.
//!
//! - Request side: [`read_request`] drives the line-based parser state
//!   machine over a [`Connection`](crate::connection::Connection)
//! - Response side: [`HeaderEncoder`] serializes a
//!   [`ResponseHead`](crate::protocol::ResponseHead), [`PayloadEncoder`]
//!   frames the body as identity or chunked bytes
//!
//! The encoders implement [`tokio_util::codec::Encoder`] over `BytesMut`:
//!
//! ```
//! use abyss_http::codec::{HeaderEncoder, PayloadEncoder};
//! use abyss_http::protocol::{PayloadItem, ResponseHead};
//! use bytes::BytesMut;
//! use http::StatusCode;
//! use tokio_util::codec::Encoder;
//!
//! let mut head = ResponseHead::with_status(StatusCode::OK);
//! head.headers.set("Transfer-Encoding", "chunked");
//!
//! let mut dst = BytesMut::new();
//! HeaderEncoder.encode(&head, &mut dst).unwrap();
//!
//! let mut body = PayloadEncoder::chunked();
//! body.encode(PayloadItem::Chunk(&b"hello"[..]), &mut dst).unwrap();
//! body.encode(PayloadItem::<&[u8]>::Eof, &mut dst).unwrap();
//!
//! assert!(dst.ends_with(b"5\r\nhello\r\n0\r\n\r\n"));
//! ```

mod chunked_encoder;
mod header_encoder;
mod payload_encoder;
mod request_parser;

pub use chunked_encoder::ChunkedEncoder;
pub use header_encoder::HeaderEncoder;
pub use header_encoder::UNKNOWN_REASON;
pub use payload_encoder::PayloadEncoder;
pub use request_parser::{apply_header, parse_header_line, parse_request_line, read_request};
