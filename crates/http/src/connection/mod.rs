//! Buffered connections and how they are executed.
//!
//! - [`Connection`]: a channel with a fixed read buffer, byte counters and
//!   the throttled transfer path
//! - [`line_reader`]: deadline-bounded line assembly with header folding
//! - [`ExecutionMode`], [`ConnectionJob`], [`ConnectionWorker`]: foreground or
//!   background execution with create/start/close/kill phases

#[allow(clippy::module_inception, reason = "the module is named after its main type")]
mod connection;
pub use connection::BUFFER_SIZE;
pub use connection::Channel;
pub use connection::Connection;
pub use connection::DEFAULT_TRANSFER_CHUNK;

mod execution;
pub use execution::ConnectionJob;
pub use execution::ConnectionWorker;
pub use execution::ExecutionMode;
pub use execution::WorkerStatus;

pub mod line_reader;
