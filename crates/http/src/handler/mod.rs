//! Request handlers and how they are tried.
//!
//! Every handler sees a [`Transaction`] and either answers it
//! ([`HandlerOutcome::Handled`]) or passes ([`HandlerOutcome::Declined`]).
//! A [`HandlerStack`] tries the most recently registered handler first and
//! falls back to its default handler when all of them decline.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;

use crate::transaction::Transaction;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled,
    Declined,
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, txn: &mut Transaction<'_>) -> Result<HandlerOutcome, BoxError>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a, 'c> Fn(&'a mut Transaction<'c>) -> BoxFuture<'a, Result<HandlerOutcome, BoxError>> + Send + Sync,
{
    async fn handle(&self, txn: &mut Transaction<'_>) -> Result<HandlerOutcome, BoxError> {
        (self.f)(txn).await
    }
}

/// Turns a closure returning a boxed future into a [`Handler`].
///
/// ```
/// use abyss_http::handler::{HandlerOutcome, handler_fn};
/// use http::StatusCode;
///
/// let hello = handler_fn(|txn| {
///     Box::pin(async move {
///         if txn.uri() != "/hello" {
///             return Ok(HandlerOutcome::Declined);
///         }
///         txn.set_status(StatusCode::OK)?;
///         txn.set_content_length(5)?;
///         txn.write_body(b"hello").await?;
///         txn.write_end().await?;
///         Ok(HandlerOutcome::Handled)
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a, 'c> Fn(&'a mut Transaction<'c>) -> BoxFuture<'a, Result<HandlerOutcome, BoxError>> + Send + Sync,
{
    HandlerFn { f }
}

/// Answers every request with a 404 error page.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, txn: &mut Transaction<'_>) -> Result<HandlerOutcome, BoxError> {
        txn.send_error(StatusCode::NOT_FOUND, None).await?;
        Ok(HandlerOutcome::Handled)
    }
}

/// Registered handlers plus the default one.
pub struct HandlerStack {
    handlers: Vec<Box<dyn Handler>>,
    default: Box<dyn Handler>,
}

impl HandlerStack {
    pub fn new() -> Self {
        Self { handlers: Vec::new(), default: Box::new(NotFoundHandler) }
    }

    /// Registers a handler; it is tried before all earlier ones.
    pub fn push(&mut self, handler: impl Handler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn set_default(&mut self, handler: impl Handler + 'static) {
        self.default = Box::new(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Offers the transaction to each handler, newest first, then to the
    /// default handler.
    pub async fn dispatch(&self, txn: &mut Transaction<'_>) -> Result<HandlerOutcome, BoxError> {
        for handler in self.handlers.iter().rev() {
            if handler.handle(txn).await? == HandlerOutcome::Handled {
                return Ok(HandlerOutcome::Handled);
            }
        }
        self.default.handle(txn).await
    }
}

impl Default for HandlerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerStack").field("handlers", &self.handlers.len()).finish_non_exhaustive()
    }
}
