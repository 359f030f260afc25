//! Registry client abstraction.
//!
//! The package registry client belongs to the host environment. The core
//! only needs four asynchronous primitives from it, captured by
//! [`RegistryClient`]. The client handles one operation at a time; callers
//! must not issue a second call before the first completes.

mod manifest;
mod policy;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use manifest::ManifestClient;
#[cfg(test)]
pub(crate) use manifest::parse_install_spec;
pub use policy::ClientPolicy;

/// A package reported by [`RegistryClient::list`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl InstalledPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

/// Operations offered by the host's package registry client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Packages currently installed in the project.
    async fn list(&self) -> Result<Vec<InstalledPackage>>;

    /// Install from a raw package id, `id@version`, or a git locator.
    async fn add(&self, spec: &str) -> Result<()>;

    /// Uninstall the package with the given id.
    async fn remove(&self, id: &str) -> Result<()>;

    /// Re-resolve the project's full dependency graph.
    async fn resolve(&self) -> Result<()>;
}
