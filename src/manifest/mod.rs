//! Manifest store: idempotent edits to the project's package manifest.
//!
//! The manifest is a JSON document with a `dependencies` object and a
//! `scopedRegistries` array. Every call reads the document fresh from disk,
//! so edits made by other tools between two calls are never clobbered by a
//! stale copy. Mutating calls that change something persist the whole
//! document with a single atomic replace before returning.
//!
//! Unknown top-level keys are carried through untouched, and key order is
//! preserved.

mod heal;

use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::package::ScopedRegistry;
use crate::runtime::{Runtime, write_atomic};

pub(crate) use heal::shared_scopes;

/// Manifest location relative to the project root.
pub const MANIFEST_RELATIVE_PATH: &str = "Packages/manifest.json";

/// Version written for dependencies declared without a pin.
pub const LATEST: &str = "latest";

const DEPENDENCIES: &str = "dependencies";
const SCOPED_REGISTRIES: &str = "scopedRegistries";

/// Outcome of a mutating manifest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Changed,
    Unchanged,
}

impl Mutation {
    pub fn is_changed(self) -> bool {
        self == Mutation::Changed
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found at {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to access manifest {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("manifest {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {} must contain a JSON object at the top level", .0.display())]
    NotAnObject(PathBuf),
}

type Document = Map<String, Value>;

/// Reads and edits a manifest document through a [`Runtime`].
pub struct ManifestStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> ManifestStore<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self { runtime, path }
    }

    /// Store for `<project_root>/Packages/manifest.json`.
    pub fn for_project(runtime: &'a R, project_root: &Path) -> Self {
        Self::new(runtime, project_root.join(MANIFEST_RELATIVE_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.runtime.exists(&self.path)
    }

    /// Whether `dependencies[id]` exists.
    ///
    /// An absent or unreadable manifest simply has no dependencies.
    pub fn has_dependency(&self, id: &str) -> bool {
        match self.load_if_present() {
            Ok(Some(root)) => root
                .get(DEPENDENCIES)
                .and_then(Value::as_object)
                .is_some_and(|deps| deps.contains_key(id)),
            Ok(None) => false,
            Err(e) => {
                warn!("Treating {} as not declared: {}", id, e);
                false
            }
        }
    }

    /// Declare `id` at `version` (or [`LATEST`]) unless it is already declared.
    ///
    /// An existing declaration is never overwritten, whatever its version.
    #[tracing::instrument(skip(self))]
    pub fn ensure_dependency(&self, id: &str, version: Option<&str>) -> Result<Mutation, ManifestError> {
        let mut root = self.load()?;
        let mut deps = object_field(&root, DEPENDENCIES, &self.path);

        if deps.contains_key(id) {
            debug!("Dependency {} already declared", id);
            return Ok(Mutation::Unchanged);
        }

        let version = version.filter(|v| !v.is_empty()).unwrap_or(LATEST);
        deps.insert(id.to_string(), Value::String(version.to_string()));
        root.insert(DEPENDENCIES.to_string(), Value::Object(deps));

        self.save(&root)?;
        info!("Dependency added: {}@{}", id, version);
        Ok(Mutation::Changed)
    }

    /// Declare `id` at exactly `version`, replacing any existing declaration.
    ///
    /// Conflicting requests are not reconciled: the last writer wins.
    #[tracing::instrument(skip(self))]
    pub fn set_dependency(&self, id: &str, version: &str) -> Result<Mutation, ManifestError> {
        let mut root = self.load()?;
        let mut deps = object_field(&root, DEPENDENCIES, &self.path);

        if deps.get(id).and_then(Value::as_str) == Some(version) {
            return Ok(Mutation::Unchanged);
        }

        deps.insert(id.to_string(), Value::String(version.to_string()));
        root.insert(DEPENDENCIES.to_string(), Value::Object(deps));

        self.save(&root)?;
        info!("Dependency set: {}@{}", id, version);
        Ok(Mutation::Changed)
    }

    /// Remove the declaration of `id` if there is one.
    #[tracing::instrument(skip(self))]
    pub fn remove_dependency(&self, id: &str) -> Result<Mutation, ManifestError> {
        let Some(mut root) = self.load_if_present()? else {
            debug!("No manifest at {:?}, nothing to remove", self.path);
            return Ok(Mutation::Unchanged);
        };
        let Some(Value::Object(deps)) = root.get_mut(DEPENDENCIES) else {
            return Ok(Mutation::Unchanged);
        };
        if deps.shift_remove(id).is_none() {
            return Ok(Mutation::Unchanged);
        }

        self.save(&root)?;
        info!("Dependency removed: {}", id);
        Ok(Mutation::Changed)
    }

    /// Make the registry at `url` own every scope in `scopes`.
    ///
    /// Scopes currently owned by a different registry are moved, so each
    /// scope stays owned by exactly one registry. The record's existing name
    /// is kept when the url is already declared.
    #[tracing::instrument(skip(self))]
    pub fn ensure_scoped_registry(
        &self,
        name: &str,
        url: &str,
        scopes: &[String],
    ) -> Result<Mutation, ManifestError> {
        let mut root = self.load()?;
        let mut registries = array_field(&root, SCOPED_REGISTRIES, &self.path);

        if !heal::ensure_registry_scopes(&mut registries, name, url, scopes) {
            return Ok(Mutation::Unchanged);
        }

        root.insert(SCOPED_REGISTRIES.to_string(), Value::Array(registries));
        self.save(&root)?;
        info!("Scoped registry ensured: {}", url);
        Ok(Mutation::Changed)
    }

    /// Declared dependencies in document order.
    pub fn dependencies(&self) -> Result<Vec<(String, String)>, ManifestError> {
        let root = self.load()?;
        Ok(object_field(&root, DEPENDENCIES, &self.path)
            .into_iter()
            .map(|(id, version)| {
                let version = match version {
                    Value::String(v) => v,
                    other => other.to_string(),
                };
                (id, version)
            })
            .collect())
    }

    /// Well-formed scoped registry records in document order.
    pub fn scoped_registries(&self) -> Result<Vec<ScopedRegistry>, ManifestError> {
        let root = self.load()?;
        Ok(array_field(&root, SCOPED_REGISTRIES, &self.path)
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<ScopedRegistry>(record) {
                Ok(registry) => Some(registry),
                Err(e) => {
                    warn!("Skipping malformed scoped registry in {:?}: {}", self.path, e);
                    None
                }
            })
            .collect())
    }

    /// Scopes currently claimed by more than one registry record.
    pub fn conflicting_scopes(&self) -> Result<Vec<String>, ManifestError> {
        let root = self.load()?;
        Ok(shared_scopes(&array_field(&root, SCOPED_REGISTRIES, &self.path)))
    }

    fn load(&self) -> Result<Document, ManifestError> {
        self.load_if_present()?
            .ok_or_else(|| ManifestError::Missing(self.path.clone()))
    }

    fn load_if_present(&self) -> Result<Option<Document>, ManifestError> {
        if !self.runtime.exists(&self.path) {
            return Ok(None);
        }
        let content = self
            .runtime
            .read_to_string(&self.path)
            .map_err(|e| ManifestError::Io {
                path: self.path.clone(),
                message: format!("{:#}", e),
            })?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(root)) => Ok(Some(root)),
            Ok(_) => Err(ManifestError::NotAnObject(self.path.clone())),
            Err(source) => Err(ManifestError::Parse {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, root: &Document) -> Result<(), ManifestError> {
        let mut content = serde_json::to_string_pretty(root).map_err(|e| ManifestError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        content.push('\n');
        write_atomic(self.runtime, &self.path, content.as_bytes()).map_err(|e| ManifestError::Io {
            path: self.path.clone(),
            message: format!("{:#}", e),
        })
    }
}

fn object_field(root: &Document, key: &str, path: &Path) -> Map<String, Value> {
    match root.get(key) {
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            warn!("{:?}: `{}` is not an object ({}), treating it as empty", path, key, other);
            Map::new()
        }
        None => Map::new(),
    }
}

fn array_field(root: &Document, key: &str, path: &Path) -> Vec<Value> {
    match root.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            warn!("{:?}: `{}` is not an array ({}), treating it as empty", path, key, other);
            Vec::new()
        }
        None => Vec::new(),
    }
}
