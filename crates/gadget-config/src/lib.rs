//! Shared configuration for the Gadget daemon and client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then any
//! configuration file (`--config-path` or `GADGET_CONFIG_PATH`), then
//! `GADGET_*` environment variables, then command-line flags.

mod defaults;
mod logging;

use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES,
    default_listen_host, default_listen_host_string, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoConfig;

/// Resolved configuration for the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GADGET")]
pub struct Config {
    /// Interface the server binds to.
    #[ortho_config(default = defaults::default_listen_host_string())]
    listen_host: String,
    /// TCP port the server binds to. Port `0` asks the OS for a free port.
    #[ortho_config(default = defaults::DEFAULT_LISTEN_PORT)]
    listen_port: u16,
    /// Largest frame payload a connection accepts before it is dropped.
    #[ortho_config(default = defaults::DEFAULT_MAX_FRAME_BYTES)]
    max_frame_bytes: usize,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    log_format: LogFormat,
    /// Target identifiers served by the daemon's local target table.
    #[serde(default)]
    targets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            targets: Vec::new(),
        }
    }
}

impl Config {
    /// Interface the server binds to.
    #[must_use]
    pub fn listen_host(&self) -> &str {
        &self.listen_host
    }

    /// TCP port the server binds to.
    #[must_use]
    pub const fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Largest accepted frame payload in bytes.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Target identifiers served by the local target table.
    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Returns a copy listening on `host`.
    #[must_use]
    pub fn with_listen_host(mut self, host: impl Into<String>) -> Self {
        self.listen_host = host.into();
        self
    }

    /// Returns a copy listening on `port`.
    #[must_use]
    pub const fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Returns a copy with a different frame ceiling.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Returns a copy logging with the `filter` directives.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Returns a copy logging in `format`.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Returns a copy serving `targets` from the local target table.
    #[must_use]
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_constants() {
        let config = Config::default();
        assert_eq!(config.listen_host(), DEFAULT_LISTEN_HOST);
        assert_eq!(config.listen_port(), 4444);
        assert_eq!(config.max_frame_bytes(), 16 * 1024 * 1024);
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.targets().is_empty());
    }

    #[test]
    fn builders_override_fields() {
        let config = Config::default()
            .with_listen_host("0.0.0.0")
            .with_listen_port(0)
            .with_max_frame_bytes(64)
            .with_targets(["com.example.target"]);
        assert_eq!(config.listen_host(), "0.0.0.0");
        assert_eq!(config.listen_port(), 0);
        assert_eq!(config.max_frame_bytes(), 64);
        assert_eq!(config.targets(), ["com.example.target".to_owned()]);
    }
}
