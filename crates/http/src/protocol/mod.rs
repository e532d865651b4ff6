//! Protocol value types and the error taxonomy.
//!
//! Nothing in here touches a socket. The types are filled in by
//! [`codec`](crate::codec) and read or written through a
//! [`Transaction`](crate::transaction::Transaction):
//!
//! - [`Method`] and [`HttpVersion`]: request-line tokens
//! - [`HeaderTable`]: ordered, case-insensitive header storage
//! - [`RangeSpec`]: `Range: bytes=` specs
//! - [`uri`]: target splitting, percent-decoding and path canonicalization
//! - [`RequestHead`]: everything parsed from one request
//! - [`ResponseHead`]: status and headers a handler builds up
//! - [`PayloadItem`]: body stream items fed to the payload encoders
//! - [`HttpError`], [`ParseError`], [`SendError`], [`ConnError`]

mod message;
pub use message::PayloadItem;

mod method;
pub use method::Method;

mod version;
pub use version::HttpVersion;

mod header_table;
pub use header_table::HeaderTable;

mod range;
pub use range::RangeSpec;
pub use range::parse_ranges;

pub mod uri;
pub use uri::DEFAULT_PORT;

mod request;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::ConnError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
