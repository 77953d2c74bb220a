//! Discovery and attach collaborators consumed by the dispatcher.
//!
//! Locating a target and binding its capability are host facilities. The
//! daemon only sees them through [`TargetDiscovery`] (answers `listApps`) and
//! [`TargetAttacher`] (answers `connectApp`). [`LocalTargets`] implements both
//! from an in-process table of capability factories.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, info};

use crate::capability::Capability;
use crate::registry::CapabilityRegistry;

const ATTACH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::attach");

/// Enumerates targets that expose a capability.
pub trait TargetDiscovery: Send + Sync {
    /// Identifiers of the discoverable targets.
    fn list_targets(&self) -> Vec<String>;
}

/// Binds a target's capability and registers it.
pub trait TargetAttacher: Send + Sync {
    /// Starts attaching to `target`.
    ///
    /// Returning `Ok` means the attach was initiated. Completion is observed
    /// only through `registry`, which the attacher updates once the binding
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError`] when the attach cannot be initiated.
    fn attach(&self, target: &str, registry: Arc<CapabilityRegistry>) -> Result<(), AttachError>;
}

/// Failure to initiate an attach.
#[derive(Debug, Error)]
pub enum AttachError {
    /// The target is not discoverable.
    #[error("target {target} is not discoverable")]
    UnknownTarget {
        /// Requested target.
        target: String,
    },
    /// The background attach thread could not be started.
    #[error("failed to start attach for {target}: {source}")]
    Spawn {
        /// Requested target.
        target: String,
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },
}

impl AttachError {
    /// Creates an unknown target error.
    pub fn unknown_target(target: impl Into<String>) -> Self {
        Self::UnknownTarget {
            target: target.into(),
        }
    }
}

/// Builds a fresh capability for one attach.
pub type CapabilityFactory = dyn Fn() -> Arc<dyn Capability> + Send + Sync;

/// In-process target table implementing discovery and attach.
///
/// Each attach runs the target's factory on a short-lived background thread
/// and registers the result, so completion is asynchronous just as it is for
/// externally launched targets.
#[derive(Clone, Default)]
pub struct LocalTargets {
    factories: BTreeMap<String, Arc<CapabilityFactory>>,
}

impl LocalTargets {
    /// Builds an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `target`, served by `factory`.
    #[must_use]
    pub fn with_target<F>(mut self, target: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Capability> + Send + Sync + 'static,
    {
        self.insert(target, factory);
        self
    }

    /// Adds or replaces `target`.
    pub fn insert<F>(&mut self, target: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Capability> + Send + Sync + 'static,
    {
        self.factories.insert(target.into(), Arc::new(factory));
    }

    /// Whether the table serves `target`.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.factories.contains_key(target)
    }
}

impl TargetDiscovery for LocalTargets {
    fn list_targets(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl TargetAttacher for LocalTargets {
    fn attach(&self, target: &str, registry: Arc<CapabilityRegistry>) -> Result<(), AttachError> {
        let factory = self
            .factories
            .get(target)
            .map(Arc::clone)
            .ok_or_else(|| AttachError::unknown_target(target))?;
        let owned = target.to_owned();
        debug!(target: ATTACH_TARGET, target_id = %owned, "attach initiated");
        thread::Builder::new()
            .name(format!("gadget-attach-{owned}"))
            .spawn(move || {
                let capability = factory();
                registry.register(owned.clone(), capability);
                info!(target: ATTACH_TARGET, target_id = %owned, "attach completed");
            })
            .map(drop)
            .map_err(|source| AttachError::Spawn {
                target: target.to_owned(),
                source,
            })
    }
}

impl fmt::Debug for LocalTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTargets")
            .field("targets", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
