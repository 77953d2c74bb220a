//! Target-to-capability bindings shared by every connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::capability::Capability;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Concurrency-safe map from target identifier to its capability handle.
///
/// A single mutex orders every operation. Lookups clone the handle out and
/// release the lock before any call is made on it, so a slow invocation on
/// one target never blocks registry access for others.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: Mutex<HashMap<String, Arc<dyn Capability>>>,
}

impl CapabilityRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `target` currently has a capability bound.
    #[must_use]
    pub fn is_registered(&self, target: &str) -> bool {
        self.entries().contains_key(target)
    }

    /// Binds `handle` to `target`.
    ///
    /// An existing binding is released before the new handle is stored. Both
    /// steps happen under the registry lock, so no lookup can return a handle
    /// whose release has started.
    pub fn register(&self, target: impl Into<String>, handle: Arc<dyn Capability>) {
        let target = target.into();
        let mut entries = self.entries();
        if let Some(previous) = entries.remove(&target) {
            debug!(target: REGISTRY_TARGET, target_id = %target, "releasing replaced capability");
            previous.release();
        }
        info!(target: REGISTRY_TARGET, target_id = %target, "capability registered");
        entries.insert(target, handle);
    }

    /// Removes the binding for `target`, returning it when present.
    pub fn unregister(&self, target: &str) -> Option<Arc<dyn Capability>> {
        let removed = self.entries().remove(target);
        if removed.is_some() {
            info!(target: REGISTRY_TARGET, target_id = %target, "capability unregistered");
        }
        removed
    }

    /// Returns the handle bound to `target`.
    #[must_use]
    pub fn lookup(&self, target: &str) -> Option<Arc<dyn Capability>> {
        self.entries().get(target).map(Arc::clone)
    }

    /// Sorted snapshot of the bound target identifiers.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.entries().keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Number of bound targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no target is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    // Every mutation is a single insert or remove, so a panic while the lock
    // is held cannot leave the map half-updated.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Capability>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("targets", &self.targets())
            .finish()
    }
}
