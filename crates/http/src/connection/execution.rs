//! How a connection's work gets run.
//!
//! A [`ConnectionJob`] is created first and started later, so the owner can
//! register it (for reaping or shutdown) before any request is read. Starting
//! yields a [`ConnectionWorker`], the handle used for teardown.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Where a connection's work executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// On the caller's task; `start` returns once the work is done.
    Foreground,
    /// On a dedicated task spawned by `start`.
    #[default]
    Background,
}

/// Flags shared between a running job and whoever holds its worker.
#[derive(Debug)]
pub struct WorkerStatus {
    finished: AtomicBool,
    connected: AtomicBool,
}

impl WorkerStatus {
    fn new() -> Self {
        Self { finished: AtomicBool::new(false), connected: AtomicBool::new(true) }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Cleared by [`ConnectionWorker::kill`]; long-running work checks it
    /// between transactions.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Work for one connection that has been set up but not started.
pub struct ConnectionJob<F> {
    mode: ExecutionMode,
    status: Arc<WorkerStatus>,
    work: F,
}

impl<F> fmt::Debug for ConnectionJob<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionJob").field("mode", &self.mode).field("status", &self.status).finish_non_exhaustive()
    }
}

impl<F, Fut> ConnectionJob<F>
where
    F: FnOnce(Arc<WorkerStatus>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(mode: ExecutionMode, work: F) -> Self {
        Self { mode, status: Arc::new(WorkerStatus::new()), work }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn status(&self) -> &Arc<WorkerStatus> {
        &self.status
    }

    /// Runs the work. In [`ExecutionMode::Foreground`] this resolves only
    /// after the work has finished.
    pub async fn start(self) -> ConnectionWorker {
        let status = self.status;
        let work = (self.work)(Arc::clone(&status));
        let finished = Arc::clone(&status);
        let task = async move {
            work.await;
            finished.finished.store(true, Ordering::Release);
        };

        match self.mode {
            ExecutionMode::Foreground => {
                task.await;
                ConnectionWorker { status, handle: None }
            }
            ExecutionMode::Background => ConnectionWorker { status, handle: Some(tokio::spawn(task)) },
        }
    }
}

/// A started connection job.
#[derive(Debug)]
pub struct ConnectionWorker {
    status: Arc<WorkerStatus>,
    handle: Option<JoinHandle<()>>,
}

impl ConnectionWorker {
    pub fn is_finished(&self) -> bool {
        self.status.is_finished() || self.handle.as_ref().is_some_and(JoinHandle::is_finished)
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Waits for the work to complete.
    pub async fn close(mut self) {
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            warn!(cause = %e, "connection worker panicked");
        }
    }

    /// Marks the connection as no longer connected and aborts the work.
    pub fn kill(&mut self) {
        self.status.connected.store(false, Ordering::Release);
        if let Some(handle) = &self.handle {
            debug!("aborting connection worker");
            handle.abort();
        }
    }
}
