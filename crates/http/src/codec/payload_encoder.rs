use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::chunked_encoder::ChunkedEncoder;
use crate::protocol::{PayloadItem, SendError};

/// encode payload for response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// bytes written as they are, framed by content-length or connection close
    Identity { eof: bool },

    /// transfer-encoding chunked payload
    Chunked(ChunkedEncoder),
}

impl PayloadEncoder {
    /// create an identity `PayloadEncoder`
    pub fn identity() -> Self {
        Self { kind: Kind::Identity { eof: false } }
    }

    /// create a chunked `PayloadEncoder`
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new()) }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Identity { eof } => *eof,
            Kind::Chunked(encoder) => encoder.is_finish(),
        }
    }
}

impl Default for PayloadEncoder {
    fn default() -> Self {
        Self::identity()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Identity { eof: true } => Ok(()),
            Kind::Identity { eof } => {
                match item {
                    PayloadItem::Chunk(mut bytes) => {
                        dst.reserve(bytes.remaining());
                        while bytes.has_remaining() {
                            let chunk = bytes.chunk();
                            let n = chunk.len();
                            dst.extend_from_slice(chunk);
                            bytes.advance(n);
                        }
                    }
                    PayloadItem::Eof => *eof = true,
                }
                Ok(())
            }
            Kind::Chunked(encoder) => encoder.encode(item, dst),
        }
    }
}
