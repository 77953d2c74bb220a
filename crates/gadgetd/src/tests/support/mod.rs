//! Test harness utilities shared by the daemon suites.

mod config_loader;
mod reporter;
mod server_world;
mod world;

pub use config_loader::{FailingConfigLoader, TEST_TARGET, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use server_world::{ServerWorld, server_world};
pub use world::{TestWorld, world};
