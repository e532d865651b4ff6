use std::io::Write;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::protocol::{PayloadItem, SendError};

/// `Transfer-Encoding: chunked` framing.
///
/// Each non-empty chunk becomes `<hex size>\r\n<data>\r\n`; [`PayloadItem::Eof`]
/// writes the terminal `0\r\n\r\n`. Empty chunks produce nothing, so they can
/// never end the stream early.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: usize,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Payload bytes framed so far, excluding framing overhead.
    pub fn send_size(&self) -> usize {
        self.send_size
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut bytes) => {
                let size = bytes.remaining();
                if size == 0 {
                    return Ok(());
                }
                write!(helper::Writer(dst), "{size:X}\r\n")?;
                dst.reserve(size + 2);
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let n = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(n);
                }
                dst.extend_from_slice(b"\r\n");
                self.send_size += size;
                Ok(())
            }
            PayloadItem::Eof => {
                trace!(sent = self.send_size, "chunked body finished");
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
