//! Serializes a [`ResponseHead`] into a status line, header fields and the
//! blank line that ends them.
//!
//! Negotiated fields (`Connection`, `Transfer-Encoding`, `Date`, ...) are put
//! into the head by the response writer before encoding; the encoder writes
//! the table exactly as it finds it.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{ResponseHead, SendError};

/// Initial buffer size reserved for a response head
const INIT_HEADER_SIZE: usize = 1024;

/// Reason phrase for status codes `http` has no canonical text for.
pub const UNKNOWN_REASON: &str = "No Reason";

/// Encoder for response heads. The status line always says `HTTP/1.1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<&ResponseHead> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, head: &ResponseHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let status = head.effective_status();

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(UNKNOWN_REASON))?;

        for (name, value) in head.headers.iter() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writer over `BytesMut` for `write!` formatting.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use indoc::indoc;

    use super::*;

    #[test]
    fn encodes_status_line_and_fields_in_order() {
        let mut head = ResponseHead::with_status(StatusCode::OK);
        head.headers.add("Content-Type", "text/plain");
        head.headers.add("Set-Cookie", "a=1");
        head.headers.add("Set-Cookie", "b=2");

        let mut dst = BytesMut::new();
        HeaderEncoder.encode(&head, &mut dst).unwrap();

        let expected = indoc! {"
            HTTP/1.1 200 OK\r
            Content-Type: text/plain\r
            Set-Cookie: a=1\r
            Set-Cookie: b=2\r
            \r
        "};
        assert_eq!(std::str::from_utf8(&dst).unwrap(), expected);
    }

    #[test]
    fn unset_status_is_500() {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode(&ResponseHead::new(), &mut dst).unwrap();
        assert!(dst.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn unknown_reason() {
        let mut dst = BytesMut::new();
        let head = ResponseHead::with_status(StatusCode::from_u16(599).unwrap());
        HeaderEncoder.encode(&head, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 599 No Reason\r\n\r\n");
    }
}
