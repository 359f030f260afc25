//! Package entries: the unit of provisioning.
//!
//! A [`PackageEntry`] describes one package the project should (or should
//! no longer) depend on, and where it comes from. Entries are read-only
//! configuration; nothing in the orchestrator mutates them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, URL-addressed package source restricted to a set of scopes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopedRegistry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ScopedRegistry {
    pub fn new(name: impl Into<String>, url: impl Into<String>, scopes: &[&str]) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Key identifying this registry request within a batch.
    ///
    /// Two entries that target the same url with the same scopes (in any
    /// order) share a key, so the manifest only needs healing once.
    pub fn key(&self) -> String {
        let mut scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        scopes.sort_unstable();
        scopes.dedup();
        format!("{}|{}", self.url, scopes.join(","))
    }
}

/// Where a package comes from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PackageSource {
    /// A package from the default registry, optionally pinned.
    Registry {
        package_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    /// A package fetched from a git locator such as `https://host/repo.git#main`.
    Git { package_id: String, url: String },
    /// A package served by a scoped registry that must be declared first.
    ScopedRegistry {
        package_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        registry: ScopedRegistry,
    },
}

/// One provisioning unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    /// Display name; may be empty.
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub source: PackageSource,
    /// Realize this entry purely as a manifest dependency edit, never
    /// through the registry client.
    #[serde(default)]
    pub declaration_only: bool,
}

impl PackageEntry {
    pub fn registry(package_id: impl Into<String>, version: Option<&str>) -> Self {
        Self::from_source(PackageSource::Registry {
            package_id: package_id.into(),
            version: version.map(str::to_string),
        })
    }

    pub fn git(package_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::from_source(PackageSource::Git {
            package_id: package_id.into(),
            url: url.into(),
        })
    }

    pub fn scoped(
        package_id: impl Into<String>,
        version: Option<&str>,
        registry: ScopedRegistry,
    ) -> Self {
        Self::from_source(PackageSource::ScopedRegistry {
            package_id: package_id.into(),
            version: version.map(str::to_string),
            registry,
        })
    }

    fn from_source(source: PackageSource) -> Self {
        Self {
            name: String::new(),
            source,
            declaration_only: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn declaration_only(mut self) -> Self {
        self.declaration_only = true;
        self
    }

    pub fn package_id(&self) -> &str {
        match &self.source {
            PackageSource::Registry { package_id, .. }
            | PackageSource::Git { package_id, .. }
            | PackageSource::ScopedRegistry { package_id, .. } => package_id,
        }
    }

    /// Pinned version, if any. Git entries carry their revision in the url.
    pub fn version(&self) -> Option<&str> {
        match &self.source {
            PackageSource::Registry { version, .. }
            | PackageSource::ScopedRegistry { version, .. } => version.as_deref(),
            PackageSource::Git { .. } => None,
        }
    }

    /// Version string declared in the manifest for a declaration-only entry.
    pub fn declared_version(&self) -> Option<&str> {
        match &self.source {
            PackageSource::Git { url, .. } => Some(url),
            _ => self.version(),
        }
    }

    pub fn registry_source(&self) -> Option<&ScopedRegistry> {
        match &self.source {
            PackageSource::ScopedRegistry { registry, .. } => Some(registry),
            _ => None,
        }
    }

    /// The string handed to the registry client's `add`.
    ///
    /// Git entries install as `id@url` so the dependency is keyed by the
    /// configured id (just the url when no id is set); everything else
    /// installs as `id` or `id@version`.
    pub fn install_spec(&self) -> String {
        match &self.source {
            PackageSource::Git { package_id, url } if package_id.is_empty() => url.clone(),
            PackageSource::Git { package_id, url } => format!("{}@{}", package_id, url),
            _ => match self.version() {
                Some(v) if !v.is_empty() => format!("{}@{}", self.package_id(), v),
                _ => self.package_id().to_string(),
            },
        }
    }
}

impl fmt::Display for PackageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.package_id())
        } else {
            write!(f, "{} ({})", self.name, self.package_id())
        }
    }
}
