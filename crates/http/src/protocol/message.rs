use bytes::{Buf, Bytes};

/// An item of an outgoing body stream.
///
/// Payload encoders turn a sequence of these into identity or chunked framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A piece of body data
    Chunk(Data),
    /// Marks the end of the body
    Eof,
}
