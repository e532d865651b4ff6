//! The listening side: configuration, the accept loop and per-connection
//! sessions.

mod config;
mod date;
mod request_log;
#[allow(clippy::module_inception, reason = "the module is named after its main type")]
mod server;
mod session;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use date::{DateService, http_date};
pub use request_log::RequestLog;
pub use server::{Server, ServerBuilder, ServerError};
