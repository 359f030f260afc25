//! Provisioning orchestrator.
//!
//! Sequences install and remove batches against the registry client and
//! the manifest. A batch is drained front to back; every client call is
//! awaited before the next entry is looked at, so exactly one call is in
//! flight at a time. Once the queue is empty the orchestrator resolves
//! (when the manifest was edited directly) and refreshes the catalog.
//!
//! ```text
//! Idle -> Draining -> AwaitingClient -> Draining -> ... -> AwaitingResolve -> Refreshing -> Idle
//! ```

mod queue;

pub use queue::ProvisioningQueue;

use log::{debug, info, warn};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::catalog::PackageCatalog;
use crate::client::{ClientPolicy, RegistryClient};
use crate::manifest::{ManifestError, ManifestStore};
use crate::package::PackageEntry;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install => write!(f, "install"),
            Operation::Remove => write!(f, "remove"),
        }
    }
}

/// A labelled list of entries to install or remove together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub operation: Operation,
    pub label: String,
    pub entries: Vec<PackageEntry>,
}

impl Batch {
    pub fn install(label: impl Into<String>, entries: Vec<PackageEntry>) -> Self {
        Self {
            operation: Operation::Install,
            label: label.into(),
            entries,
        }
    }

    pub fn remove(label: impl Into<String>, entries: Vec<PackageEntry>) -> Self {
        Self {
            operation: Operation::Remove,
            label: label.into(),
            entries,
        }
    }
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Draining { label: String, pending: usize },
    AwaitingClient { operation: Operation, spec: String },
    AwaitingResolve,
    Refreshing,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorState::Idle => write!(f, "idle"),
            OrchestratorState::Draining { label, pending } => {
                write!(f, "processing {} ({} pending)", label, pending)
            }
            OrchestratorState::AwaitingClient { operation, spec } => {
                write!(f, "waiting for {} of {}", operation, spec)
            }
            OrchestratorState::AwaitingResolve => write!(f, "resolving packages"),
            OrchestratorState::Refreshing => write!(f, "refreshing package list"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("another provisioning batch is still running")]
    Busy,

    #[error("failed to {operation} {package}: {message}")]
    Adapter {
        operation: Operation,
        package: String,
        message: String,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("package resolve failed: {0}")]
    Resolve(String),

    #[error("failed to refresh installed packages: {0}")]
    Refresh(String),
}

/// Outcome of one batch.
#[derive(Debug)]
pub struct BatchReport {
    pub label: String,
    pub operation: Operation,
    /// Entries handled successfully, in order.
    pub processed: Vec<PackageEntry>,
    /// Whether the manifest was edited directly during the batch.
    pub needs_resolve: bool,
    pub resolved: bool,
    /// First failure; draining stopped there.
    pub failure: Option<ProvisionError>,
    /// The failed entry followed by everything never attempted.
    pub remaining: Vec<PackageEntry>,
}

impl BatchReport {
    fn new(label: String, operation: Operation) -> Self {
        Self {
            label,
            operation,
            processed: Vec::new(),
            needs_resolve: false,
            resolved: false,
            failure: None,
            remaining: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the orchestrator to `Idle` however the batch ends.
struct IdleOnDrop<'s> {
    state: &'s Mutex<OrchestratorState>,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *lock(self.state) = OrchestratorState::Idle;
    }
}

/// Session object driving batches for one project.
pub struct Orchestrator<'a, R: Runtime, C: RegistryClient> {
    manifest: ManifestStore<'a, R>,
    client: C,
    policy: ClientPolicy,
    catalog: Mutex<PackageCatalog>,
    state: Mutex<OrchestratorState>,
}

impl<'a, R: Runtime, C: RegistryClient> Orchestrator<'a, R, C> {
    pub fn new(manifest: ManifestStore<'a, R>, client: C, policy: ClientPolicy) -> Self {
        Self {
            manifest,
            client,
            policy,
            catalog: Mutex::new(PackageCatalog::new()),
            state: Mutex::new(OrchestratorState::Idle),
        }
    }

    pub fn manifest(&self) -> &ManifestStore<'a, R> {
        &self.manifest
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> OrchestratorState {
        lock(&self.state).clone()
    }

    pub fn is_busy(&self) -> bool {
        *lock(&self.state) != OrchestratorState::Idle
    }

    /// Copy of the last catalog snapshot.
    pub fn catalog(&self) -> PackageCatalog {
        lock(&self.catalog).clone()
    }

    pub fn is_installed(&self, entry: &PackageEntry) -> bool {
        lock(&self.catalog).is_installed(entry, &self.manifest)
    }

    /// Required entries that are not installed according to the last snapshot.
    pub fn missing(&self, required: &[PackageEntry]) -> Vec<PackageEntry> {
        lock(&self.catalog).missing(required, &self.manifest)
    }

    fn set_state(&self, state: OrchestratorState) {
        debug!("Orchestrator state: {}", state);
        *lock(&self.state) = state;
    }

    /// Leave `Idle` for `next`, or refuse when a batch is already running.
    fn enter(&self, next: OrchestratorState) -> Result<IdleOnDrop<'_>, ProvisionError> {
        let mut state = lock(&self.state);
        if *state != OrchestratorState::Idle {
            return Err(ProvisionError::Busy);
        }
        *state = next;
        Ok(IdleOnDrop { state: &self.state })
    }

    /// Replace the catalog with what the client currently reports.
    ///
    /// A failed listing keeps the previous snapshot.
    pub async fn refresh_catalog(&self) -> Result<(), ProvisionError> {
        let _idle = self.enter(OrchestratorState::Refreshing)?;
        self.refresh().await
    }

    async fn refresh(&self) -> Result<(), ProvisionError> {
        let packages = self
            .policy
            .run("list", || self.client.list())
            .await
            .map_err(|e| ProvisionError::Refresh(format!("{:#}", e)))?;
        debug!("Catalog refreshed with {} package(s)", packages.len());
        lock(&self.catalog).replace(packages);
        Ok(())
    }

    /// Drain `batch` to completion.
    ///
    /// Only [`ProvisionError::Busy`] is returned as an error. Any other
    /// failure stops the draining and is carried in the report, after the
    /// pending resolve and the catalog refresh have still been run.
    #[tracing::instrument(skip(self, batch), fields(label = %batch.label, operation = %batch.operation))]
    pub async fn run_batch(&self, batch: Batch) -> Result<BatchReport, ProvisionError> {
        let Batch {
            operation,
            label,
            entries,
        } = batch;
        let _idle = self.enter(OrchestratorState::Draining {
            label: label.clone(),
            pending: entries.len(),
        })?;
        info!("Starting {} batch {} ({} entries)", operation, label, entries.len());

        let mut queue = ProvisioningQueue::new(entries);
        let mut report = BatchReport::new(label, operation);
        let mut failed_entry = None;

        while let Some(entry) = queue.pop() {
            self.set_state(OrchestratorState::Draining {
                label: report.label.clone(),
                pending: queue.len(),
            });
            match self.provision(operation, &entry, &mut queue).await {
                Ok(()) => report.processed.push(entry),
                Err(e) => {
                    warn!("Stopping batch {}: {}", report.label, e);
                    report.failure = Some(e);
                    failed_entry = Some(entry);
                    break;
                }
            }
        }

        report.needs_resolve = queue.needs_resolve();
        report.remaining = failed_entry.into_iter().chain(queue.into_remaining()).collect();

        if report.needs_resolve {
            self.set_state(OrchestratorState::AwaitingResolve);
            match self.policy.run("resolve", || self.client.resolve()).await {
                Ok(()) => {
                    report.resolved = true;
                    // let the host settle before listing
                    tokio::task::yield_now().await;
                }
                Err(e) => {
                    warn!("Resolve failed: {:#}", e);
                    report
                        .failure
                        .get_or_insert(ProvisionError::Resolve(format!("{:#}", e)));
                }
            }
        }

        self.set_state(OrchestratorState::Refreshing);
        if let Err(e) = self.refresh().await {
            warn!("{}", e);
            report.failure.get_or_insert(e);
        }

        if report.is_success() {
            info!("Finished {} batch {}", operation, report.label);
        }
        Ok(report)
    }

    async fn provision(
        &self,
        operation: Operation,
        entry: &PackageEntry,
        queue: &mut ProvisioningQueue,
    ) -> Result<(), ProvisionError> {
        if operation == Operation::Install
            && let Some(registry) = entry.registry_source()
            && queue.claim_registry(registry)
            && self
                .manifest
                .ensure_scoped_registry(&registry.name, &registry.url, &registry.scopes)?
                .is_changed()
        {
            queue.mark_resolve_needed();
        }

        if entry.declaration_only {
            let id = entry.package_id();
            let mutation = match operation {
                Operation::Install => self.manifest.ensure_dependency(id, entry.declared_version())?,
                Operation::Remove => self.manifest.remove_dependency(id)?,
            };
            if mutation.is_changed() {
                queue.mark_resolve_needed();
            }
            return Ok(());
        }

        let target = match operation {
            Operation::Install => entry.install_spec(),
            Operation::Remove => entry.package_id().to_string(),
        };
        self.set_state(OrchestratorState::AwaitingClient {
            operation,
            spec: target.clone(),
        });
        info!("{}: {}", operation, target);

        let outcome = match operation {
            Operation::Install => self.policy.run("add", || self.client.add(&target)).await,
            Operation::Remove => self.policy.run("remove", || self.client.remove(&target)).await,
        };
        outcome.map_err(|e| ProvisionError::Adapter {
            operation,
            package: entry.to_string(),
            message: format!("{:#}", e),
        })
    }

    /// Install every required entry that is not installed yet, as one batch.
    pub async fn install_missing(&self, required: &[PackageEntry]) -> Result<BatchReport, ProvisionError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            debug!("All required packages are installed");
        }
        self.run_batch(Batch::install("required packages", missing)).await
    }

    /// Install the framework package unless it is already installed.
    pub async fn install_framework(&self, framework: &PackageEntry) -> Result<BatchReport, ProvisionError> {
        let entries = if self.is_installed(framework) {
            debug!("{} is already installed", framework);
            Vec::new()
        } else {
            vec![framework.clone()]
        };
        self.run_batch(Batch::install("framework", entries)).await
    }
}
