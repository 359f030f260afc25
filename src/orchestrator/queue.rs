//! Per-batch work queue.

use std::collections::{HashSet, VecDeque};

use crate::package::{PackageEntry, ScopedRegistry};

/// FIFO of entries for one batch plus the bookkeeping that lives exactly
/// as long as the batch.
#[derive(Debug, Default)]
pub struct ProvisioningQueue {
    entries: VecDeque<PackageEntry>,
    needs_resolve: bool,
    ensured_registries: HashSet<String>,
}

impl ProvisioningQueue {
    pub fn new(entries: Vec<PackageEntry>) -> Self {
        Self {
            entries: entries.into(),
            ..Default::default()
        }
    }

    pub fn pop(&mut self) -> Option<PackageEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record that the manifest changed without a client round-trip.
    pub fn mark_resolve_needed(&mut self) {
        self.needs_resolve = true;
    }

    pub fn needs_resolve(&self) -> bool {
        self.needs_resolve
    }

    /// Returns `true` the first time a registry is seen in this batch.
    pub fn claim_registry(&mut self, registry: &ScopedRegistry) -> bool {
        self.ensured_registries.insert(registry.key())
    }

    /// Entries that were never processed.
    pub fn into_remaining(self) -> Vec<PackageEntry> {
        self.entries.into()
    }
}
