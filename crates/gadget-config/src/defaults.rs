use crate::logging::LogFormat;

/// Default interface the daemon listens on.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Default TCP port the daemon listens on.
pub const DEFAULT_LISTEN_PORT: u16 = 4444;

/// Default ceiling on a single frame payload (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default listen host.
pub fn default_listen_host() -> &'static str {
    DEFAULT_LISTEN_HOST
}

/// Owned listen host used where allocation is required (e.g. serde).
pub fn default_listen_host_string() -> String {
    DEFAULT_LISTEN_HOST.to_owned()
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
