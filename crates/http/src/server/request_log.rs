use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::server::ServerError;

/// Append-only access log shared by all connections of a server.
#[derive(Debug)]
pub struct RequestLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RequestLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, ServerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ServerError::LogFile { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), file: Mutex::new(File::from_std(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line. Failures are logged, never returned; a broken log
    /// must not fail the transaction it describes.
    pub async fn write(&self, entry: &str) {
        let mut line = String::with_capacity(entry.len() + 1);
        line.push_str(entry);
        line.push('\n');

        let mut file = self.file.lock().await;
        let result = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!(path = %self.path.display(), cause = %e, "failed to write access log");
        }
    }
}
