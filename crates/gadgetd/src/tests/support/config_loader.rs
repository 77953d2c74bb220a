//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use gadget_config::{Config, OrthoConfig as _};
use ortho_config::OrthoError;

use crate::bootstrap::ConfigLoader;

/// Target served by test configurations.
pub const TEST_TARGET: &str = "com.example.target";

/// Loader serving one target on an OS-assigned loopback port.
#[derive(Debug, Clone)]
pub struct TestConfigLoader {
    port: u16,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self { port: 0 }
    }

    /// Loader that binds `port` instead of a free one.
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self { port }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config::default()
            .with_listen_port(self.port)
            .with_targets([TEST_TARGET]))
    }
}

/// Loader that intentionally fails by passing an invalid port flag.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("gadgetd"),
            OsString::from("--listen-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
