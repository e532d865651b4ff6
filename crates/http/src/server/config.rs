use std::path::{Path, PathBuf};
use std::time::Duration;

/// Read-mostly settings shared by every connection of a server.
///
/// Built with [`ServerConfig::builder`]; unset values take the defaults
/// listed on each builder method.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    name: String,
    port: u16,
    files_path: PathBuf,
    timeout: Duration,
    keep_alive_timeout: Duration,
    keep_alive_max: u32,
    advertise: bool,
    log_file: Option<PathBuf>,
    max_connections: usize,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Document root for handlers that serve files.
    pub fn files_path(&self) -> &Path {
        &self.files_path
    }

    /// Budget for reading one request head.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// How long an idle keep-alive connection waits for its next request.
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    /// Requests served on one connection before it is closed.
    pub fn keep_alive_max(&self) -> u32 {
        self.keep_alive_max
    }

    /// Whether responses carry a `Server` header.
    pub fn advertise(&self) -> bool {
        self.advertise
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfigBuilder::new().build()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    fn new() -> Self {
        Self {
            config: ServerConfig {
                name: "unnamed".to_string(),
                port: 8080,
                files_path: PathBuf::from("htdocs"),
                timeout: Duration::from_secs(15),
                keep_alive_timeout: Duration::from_secs(15),
                keep_alive_max: 30,
                advertise: true,
                log_file: None,
                max_connections: 16,
            },
        }
    }

    /// Defaults to `"unnamed"`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Defaults to 8080.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Defaults to `htdocs`.
    pub fn files_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.files_path = path.into();
        self
    }

    /// Defaults to 15 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Defaults to 15 seconds; anything under one second is raised to one.
    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keep_alive_timeout = timeout;
        self
    }

    /// Defaults to 30; zero is raised to one.
    pub fn keep_alive_max(mut self, max: u32) -> Self {
        self.config.keep_alive_max = max;
        self
    }

    /// Defaults to `true`.
    pub fn advertise(mut self, advertise: bool) -> Self {
        self.config.advertise = advertise;
        self
    }

    /// Access log destination; no log is written by default.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_file = Some(path.into());
        self
    }

    /// Defaults to 16; zero is raised to one.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn build(self) -> ServerConfig {
        let mut config = self.config;
        config.keep_alive_timeout = config.keep_alive_timeout.max(Duration::from_secs(1));
        config.keep_alive_max = config.keep_alive_max.max(1);
        config.max_connections = config.max_connections.max(1);
        config
    }
}
