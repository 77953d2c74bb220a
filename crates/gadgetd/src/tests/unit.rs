//! Unit tests for the daemon launch sequence.

use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use mockall::mock;
use rstest::{fixture, rstest};

use crate::health::HealthReporter;
use crate::process::launch::run_daemon_with;
use crate::{LaunchError, ShutdownError, ShutdownReason, ShutdownSignal, bootstrap_with};

use super::support::{
    FailingConfigLoader, HealthEvent, RecordingHealthReporter, TEST_TARGET, TestConfigLoader,
};

mock! {
    Shutdown {}
    impl ShutdownSignal for Shutdown {
        fn wait(&self) -> Result<ShutdownReason, ShutdownError>;
    }
}

#[fixture]
fn reporter() -> Arc<RecordingHealthReporter> {
    Arc::new(RecordingHealthReporter::default())
}

fn as_reporter(reporter: &Arc<RecordingHealthReporter>) -> Arc<dyn HealthReporter> {
    Arc::clone(reporter) as Arc<dyn HealthReporter>
}

#[rstest]
fn bootstrap_does_not_start_the_server(reporter: Arc<RecordingHealthReporter>) {
    let daemon = bootstrap_with(&TestConfigLoader::new(), as_reporter(&reporter))
        .expect("bootstrap should succeed");

    assert_eq!(daemon.config().targets(), [TEST_TARGET.to_owned()]);
    assert_eq!(
        reporter.events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
    assert!(!daemon.server().is_running());
}

#[rstest]
fn daemon_serves_until_shutdown(reporter: Arc<RecordingHealthReporter>) {
    let mut shutdown = MockShutdown::new();
    shutdown
        .expect_wait()
        .times(1)
        .returning(|| Ok(ShutdownReason::Requested));

    run_daemon_with(&TestConfigLoader::new(), as_reporter(&reporter), &shutdown)
        .expect("daemon runs");

    let events = reporter.events();
    assert!(events.contains(&HealthEvent::ServerStarting(0)));
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::ServerListening(_)))
    );
    assert!(matches!(events.last(), Some(HealthEvent::ServerStopped(_))));
}

#[rstest]
fn signal_failure_still_stops_the_server(reporter: Arc<RecordingHealthReporter>) {
    let mut shutdown = MockShutdown::new();
    shutdown.expect_wait().times(1).returning(|| {
        Err(ShutdownError::Install {
            source: io::Error::other("signals unavailable"),
        })
    });

    let error = run_daemon_with(&TestConfigLoader::new(), as_reporter(&reporter), &shutdown)
        .expect_err("signal installation fails");

    assert!(matches!(error, LaunchError::Shutdown { .. }));
    assert!(matches!(
        reporter.events().last(),
        Some(HealthEvent::ServerStopped(_))
    ));
}

#[rstest]
fn taken_port_fails_before_waiting(reporter: Arc<RecordingHealthReporter>) {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).expect("occupy a port");
    let port = occupied.local_addr().expect("occupied address").port();
    let mut shutdown = MockShutdown::new();
    shutdown.expect_wait().times(0);

    let error = run_daemon_with(
        &TestConfigLoader::with_port(port),
        as_reporter(&reporter),
        &shutdown,
    )
    .expect_err("port is taken");

    assert!(matches!(error, LaunchError::Listener { .. }));
    assert!(reporter.events().contains(&HealthEvent::ServerStartFailed));
}

#[rstest]
fn configuration_failure_is_a_bootstrap_error(reporter: Arc<RecordingHealthReporter>) {
    let mut shutdown = MockShutdown::new();
    shutdown.expect_wait().times(0);

    let error = run_daemon_with(&FailingConfigLoader, as_reporter(&reporter), &shutdown)
        .expect_err("configuration is invalid");

    assert!(matches!(error, LaunchError::Bootstrap { .. }));
    assert!(
        reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)))
    );
}
