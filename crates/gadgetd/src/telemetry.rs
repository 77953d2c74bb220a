//! Structured telemetry initialisation for the daemon.
//!
//! Every event carries its module target (`gadgetd::dispatch`,
//! `gadgetd::transport`, ...). Events raised while a connection is served sit
//! inside the `connection` span, so JSON lines name the peer and connection id
//! alongside the request fields such as `target_id`.

use std::io::{self, IsTerminal};

use gadget_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the subscriber that is actually installed.
    ///
    /// This reflects the first successful initialisation, not necessarily the
    /// configuration passed to the call that produced this handle.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Later calls leave the installed subscriber alone and return a handle
/// describing it.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install_subscriber(config))
        .map(|format| TelemetryHandle { format: *format })
}

fn install_subscriber(config: &Config) -> Result<LogFormat, TelemetryError> {
    let subscriber = build_subscriber(config, io::stderr, io::stderr().is_terminal())?;
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(config.log_format())
}

fn build_subscriber<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        ),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex, PoisonError};

    use serde_json::Value;

    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::server::ServerContext;
    use crate::transport::connection_span;

    const TARGET: &str = "com.example.target";
    const PEER: &str = "127.0.0.1:40000";

    #[derive(Clone, Default)]
    struct CapturedLines(Arc<Mutex<Vec<u8>>>);

    impl CapturedLines {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl Write for CapturedLines {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLines {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn bridge_config(format: LogFormat) -> Config {
        Config::default()
            .with_targets([TARGET])
            .with_log_filter("gadgetd=debug")
            .with_log_format(format)
    }

    /// Serves a single attach request inside a connection span and returns
    /// what the subscriber wrote.
    fn serve_attach(config: &Config) -> Vec<String> {
        let capture = CapturedLines::default();
        let subscriber = build_subscriber(config, capture.clone(), false).expect("subscriber");
        let dispatcher = Dispatcher::new(Arc::new(ServerContext::from_config(config)));
        let peer: SocketAddr = PEER.parse().expect("peer address");

        tracing::subscriber::with_default(subscriber, || {
            connection_span(7, peer).in_scope(|| {
                let _response =
                    dispatcher.handle_payload(br#"["com.example.target", "connectApp", 1]"#);
            });
        });
        capture.lines()
    }

    #[test]
    fn json_lines_carry_connection_and_target() {
        let lines = serve_attach(&bridge_config(LogFormat::Json));

        let dispatched = lines
            .iter()
            .map(|line| serde_json::from_str::<Value>(line).expect("json line"))
            .find(|event| event["message"] == "dispatching request")
            .expect("dispatch event logged");
        assert_eq!(dispatched["target"], "gadgetd::dispatch");
        assert_eq!(dispatched["target_id"], TARGET);
        assert_eq!(dispatched["span"]["name"], "connection");
        assert_eq!(dispatched["span"]["peer"], PEER);
        assert_eq!(dispatched["span"]["id"], 7);
    }

    #[test]
    fn compact_lines_name_the_connection() {
        let lines = serve_attach(&bridge_config(LogFormat::Compact));

        let dispatched = lines
            .iter()
            .find(|line| line.contains("dispatching request"))
            .expect("dispatch event logged");
        assert!(serde_json::from_str::<Value>(dispatched).is_err());
        assert!(dispatched.contains("connection"));
        assert!(dispatched.contains(PEER));
    }

    #[test]
    fn filter_silences_debug_events() {
        let config = bridge_config(LogFormat::Json).with_log_filter("gadgetd=info");
        let lines = serve_attach(&config);
        assert!(
            lines
                .iter()
                .all(|line| !line.contains("dispatching request"))
        );
    }

    #[test]
    fn malformed_filter_is_rejected() {
        let config = Config::default().with_log_filter("gadgetd=loudest");
        let result = build_subscriber(&config, CapturedLines::default(), false);
        assert!(matches!(result, Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn later_initialisations_report_the_installed_format() {
        let first = initialise(&Config::default()).expect("telemetry");
        let second =
            initialise(&Config::default().with_log_format(LogFormat::Compact)).expect("telemetry");
        assert_eq!(second.format(), first.format());
    }
}
