use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connection::{Channel, Connection, ConnectionJob, ConnectionWorker, ExecutionMode};
use crate::handler::{Handler, HandlerStack};
use crate::server::session::serve;
use crate::server::{DateService, RequestLog, ServerConfig};

/// How often shutdown checks whether outstanding workers are done.
const REAP_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: io::Error },

    #[error("failed to open log file {}: {source}", path.display())]
    LogFile { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct ServerBuilder {
    config: Option<ServerConfig>,
    handlers: HandlerStack,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: None, handlers: HandlerStack::new() }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Registers a handler. Later registrations are tried first.
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Replaces the built-in 404 handler used when every handler declines.
    pub fn default_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.set_default(handler);
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let config = self.config.unwrap_or_default();
        let log = config.log_file().map(RequestLog::open).transpose()?;

        Ok(Server {
            inner: Arc::new(ServerInner { config, handlers: self.handlers, date: DateService::new(), log, cancel: CancellationToken::new() }),
        })
    }
}

/// State shared by every connection of one server.
#[derive(Debug)]
pub(crate) struct ServerInner {
    pub(crate) config: ServerConfig,
    pub(crate) handlers: HandlerStack,
    pub(crate) date: DateService,
    pub(crate) log: Option<RequestLog>,
    pub(crate) cancel: CancellationToken,
}

impl ServerInner {
    pub(crate) async fn log_transaction(&self, entry: &str) {
        if let Some(log) = &self.log {
            log.write(entry).await;
        }
    }
}

/// A configured server. Cloning yields another handle to the same server.
#[derive(Debug, Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Binds the configured port on all interfaces and serves until
    /// [`terminate`](Self::terminate) is called.
    pub async fn run(&self) -> Result<(), ServerError> {
        let port = self.inner.config.port();
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await.map_err(|source| ServerError::Bind { port, source })?;
        self.serve_listener(listener).await;
        Ok(())
    }

    /// Accepts connections from `listener`, each served by a background
    /// worker, until [`terminate`](Self::terminate) is called.
    ///
    /// At most `max_connections` connections are served at once. On
    /// termination outstanding workers get the request timeout to finish and
    /// are killed after that.
    pub async fn serve_listener(&self, listener: TcpListener) {
        let config = &self.inner.config;
        let cancel = &self.inner.cancel;
        info!(name = config.name(), address = ?listener.local_addr().ok(), "start listening");

        let permits = Arc::new(Semaphore::new(config.max_connections()));
        let mut workers: Vec<ConnectionWorker> = Vec::new();

        loop {
            let permit = tokio::select! {
                () = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let inner = Arc::clone(&self.inner);
            let job = ConnectionJob::new(ExecutionMode::Background, move |status| async move {
                let _permit = permit;
                serve(Connection::new(stream, peer), inner, status).await;
            });
            workers.push(job.start().await);
            workers.retain(|worker| !worker.is_finished());
        }

        info!(outstanding = workers.len(), "stop listening");
        shutdown_workers(workers, config.timeout()).await;
    }

    /// Serves one already connected channel on the caller's task.
    pub async fn run_conn<C: Channel + 'static>(&self, channel: C, peer: SocketAddr) {
        let inner = Arc::clone(&self.inner);
        let job = ConnectionJob::new(ExecutionMode::Foreground, move |status| serve(Connection::new(channel, peer), inner, status));
        job.start().await.close().await;
    }

    /// Stops accepting connections and ends idle keep-alive waits.
    pub fn terminate(&self) {
        debug!("server termination requested");
        self.inner.cancel.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

async fn shutdown_workers(mut workers: Vec<ConnectionWorker>, grace: Duration) {
    let deadline = Instant::now() + grace;
    while workers.iter().any(|worker| !worker.is_finished()) && Instant::now() < deadline {
        tokio::time::sleep(REAP_INTERVAL).await;
    }

    for worker in workers.iter_mut().filter(|worker| !worker.is_finished()) {
        error!("connection worker outlived shutdown grace period, killing it");
        worker.kill();
    }
    join_all(workers.into_iter().map(ConnectionWorker::close)).await;
}
