//! Registry client backed directly by the project manifest.
//!
//! The host editor installs packages by editing `Packages/manifest.json`
//! and re-resolving. This client performs the manifest half of that work,
//! which is enough to drive a project from the command line: the editor
//! picks up the edited manifest the next time it resolves.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{InstalledPackage, RegistryClient};
use crate::manifest::{LATEST, ManifestStore};
use crate::runtime::Runtime;

/// Lock file written by the host after a resolve, relative to the project root.
pub const LOCK_RELATIVE_PATH: &str = "Packages/packages-lock.json";

pub struct ManifestClient<'a, R: Runtime> {
    runtime: &'a R,
    manifest: ManifestStore<'a, R>,
    lock_path: PathBuf,
}

impl<'a, R: Runtime> ManifestClient<'a, R> {
    pub fn new(runtime: &'a R, project_root: &Path) -> Self {
        Self {
            runtime,
            manifest: ManifestStore::for_project(runtime, project_root),
            lock_path: project_root.join(LOCK_RELATIVE_PATH),
        }
    }

    /// Package ids recorded in the lock file, including transitive ones.
    fn locked_packages(&self) -> Vec<String> {
        if !self.runtime.exists(&self.lock_path) {
            return Vec::new();
        }
        let parsed = self
            .runtime
            .read_to_string(&self.lock_path)
            .and_then(|content| serde_json::from_str::<Value>(&content).map_err(Into::into));
        match parsed {
            Ok(lock) => lock
                .get("dependencies")
                .and_then(Value::as_object)
                .map(|deps| deps.keys().cloned().collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable lock file {:?}: {:#}", self.lock_path, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<'a, R: Runtime> RegistryClient for ManifestClient<'a, R> {
    async fn list(&self) -> Result<Vec<InstalledPackage>> {
        let mut installed: Vec<InstalledPackage> = self
            .manifest
            .dependencies()?
            .into_iter()
            .map(|(name, version)| InstalledPackage {
                name,
                version: Some(version),
            })
            .collect();

        for name in self.locked_packages() {
            if !installed.iter().any(|p| p.name == name) {
                installed.push(InstalledPackage::new(name));
            }
        }

        debug!("Listed {} installed package(s)", installed.len());
        Ok(installed)
    }

    async fn add(&self, spec: &str) -> Result<()> {
        let (id, version) = parse_install_spec(spec)?;
        let mutation = match version {
            Some(version) => self.manifest.set_dependency(&id, &version)?,
            None => self.manifest.ensure_dependency(&id, None)?,
        };
        if mutation.is_changed() {
            info!("Added {}", spec);
        } else {
            debug!("{} already present", spec);
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let mutation = self.manifest.remove_dependency(id)?;
        if !mutation.is_changed() {
            return Err(anyhow!(
                "Cannot remove {}: it is not a direct dependency of the project",
                id
            ));
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<()> {
        let conflicts = self
            .manifest
            .conflicting_scopes()
            .with_context(|| format!("Cannot resolve {:?}", self.manifest.path()))?;
        for scope in conflicts {
            warn!("Scope {} is claimed by more than one scoped registry", scope);
        }
        info!(
            "Manifest {:?} is ready; the editor re-resolves it on its next refresh",
            self.manifest.path()
        );
        Ok(())
    }
}

/// Split an install spec into the dependency key and the version to declare.
///
/// - `com.foo` -> (`com.foo`, None)
/// - `com.foo@1.2.0` -> (`com.foo`, Some(`1.2.0`))
/// - `com.foo@https://host/Repo.git#main` -> (`com.foo`, Some(the url))
/// - `https://host/Repo.git#main` -> (`Repo`, Some(the url))
pub(crate) fn parse_install_spec(spec: &str) -> Result<(String, Option<String>)> {
    let spec = spec.trim();
    if spec.is_empty() {
        anyhow::bail!("Empty install spec");
    }

    // `git@host:owner/repo.git` is an ssh locator, not `id@version`
    if !spec.starts_with("git@")
        && let Some((id, locator)) = spec.split_once('@')
        && !id.is_empty()
        && !id.contains(['/', ':'])
        && is_locator(locator)
    {
        return Ok((id.to_string(), Some(locator.to_string())));
    }

    if is_locator(spec) {
        let name = package_name_from_locator(spec)
            .ok_or_else(|| anyhow!("Cannot derive a package name from {}", spec))?;
        return Ok((name, Some(spec.to_string())));
    }

    match spec.split_once('@') {
        Some((id, version)) if !id.is_empty() => {
            let version = if version.is_empty() { LATEST } else { version };
            Ok((id.to_string(), Some(version.to_string())))
        }
        Some(_) => anyhow::bail!("Invalid install spec {}", spec),
        None => Ok((spec.to_string(), None)),
    }
}

fn is_locator(spec: &str) -> bool {
    let base = spec.split(['#', '?']).next().unwrap_or(spec);
    spec.contains("://")
        || spec.starts_with("git@")
        || spec.starts_with("git+")
        || spec.starts_with("file:")
        || base.ends_with(".git")
}

fn package_name_from_locator(locator: &str) -> Option<String> {
    let (base, query) = match locator.split_once('?') {
        Some((base, rest)) => (base, Some(rest.split('#').next().unwrap_or_default())),
        None => (locator.split('#').next().unwrap_or(locator), None),
    };

    // `?path=/Packages/com.foo` points at a sub folder; its name wins
    let sub_path = query.and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("path="))
            .filter(|p| !p.trim_matches('/').is_empty())
    });

    let source = sub_path.unwrap_or(base).trim_end_matches('/');
    let last = source.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
