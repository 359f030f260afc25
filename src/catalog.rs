//! Snapshot of the packages installed in the project.

use std::collections::HashSet;

use crate::client::InstalledPackage;
use crate::manifest::ManifestStore;
use crate::package::PackageEntry;
use crate::runtime::Runtime;

/// Installed package ids as last reported by the registry client.
///
/// The snapshot is only ever replaced as a whole, never patched, so it
/// cannot drift from what the client reported.
#[derive(Debug, Default, Clone)]
pub struct PackageCatalog {
    installed: HashSet<String>,
    refreshed: bool,
}

impl PackageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly listed set of packages.
    pub fn replace(&mut self, packages: Vec<InstalledPackage>) {
        self.installed = packages.into_iter().map(|p| p.name).collect();
        self.refreshed = true;
    }

    /// Whether the catalog has been filled at least once.
    pub fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.installed.contains(id)
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }

    /// Installed ids, sorted for display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.installed.iter().cloned().collect();
        names.sort();
        names
    }

    /// Declaration-only entries are installed when the manifest declares
    /// them; every other entry must appear in the snapshot.
    pub fn is_installed<R: Runtime>(&self, entry: &PackageEntry, manifest: &ManifestStore<'_, R>) -> bool {
        if entry.declaration_only {
            manifest.has_dependency(entry.package_id())
        } else {
            self.contains(entry.package_id())
        }
    }

    /// Entries from `required` that are not installed yet, in order.
    ///
    /// Entries without a package id cannot be checked and are skipped.
    pub fn missing<R: Runtime>(
        &self,
        required: &[PackageEntry],
        manifest: &ManifestStore<'_, R>,
    ) -> Vec<PackageEntry> {
        required
            .iter()
            .filter(|entry| !entry.package_id().is_empty())
            .filter(|entry| !self.is_installed(entry, manifest))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::project_with_manifest;

    #[test]
    fn test_replace_swaps_whole_set() {
        let mut catalog = PackageCatalog::new();
        assert!(!catalog.is_refreshed());

        catalog.replace(vec![InstalledPackage::new("com.a"), InstalledPackage::new("com.b")]);
        assert!(catalog.is_refreshed());
        assert_eq!(catalog.len(), 2);

        catalog.replace(vec![InstalledPackage::new("com.c")]);
        assert!(!catalog.contains("com.a"));
        assert_eq!(catalog.names(), vec!["com.c"]);
    }

    #[test]
    fn test_declaration_only_entries_consult_manifest() {
        let dir = project_with_manifest(r#"{"dependencies":{"com.declared":"1.0"}}"#);
        let manifest = ManifestStore::for_project(&RealRuntime, dir.path());
        let mut catalog = PackageCatalog::new();
        catalog.replace(vec![InstalledPackage::new("com.listed")]);

        let declared = PackageEntry::registry("com.declared", None).declaration_only();
        let listed_only = PackageEntry::registry("com.listed", None).declaration_only();
        let listed = PackageEntry::registry("com.listed", None);

        assert!(catalog.is_installed(&declared, &manifest));
        assert!(!catalog.is_installed(&listed_only, &manifest));
        assert!(catalog.is_installed(&listed, &manifest));
    }

    #[test]
    fn test_missing_keeps_order_and_skips_blank_ids() {
        let dir = project_with_manifest(r#"{"dependencies":{}}"#);
        let manifest = ManifestStore::for_project(&RealRuntime, dir.path());
        let mut catalog = PackageCatalog::new();
        catalog.replace(vec![InstalledPackage::new("com.b")]);

        let required = vec![
            PackageEntry::registry("com.c", None),
            PackageEntry::registry("", None),
            PackageEntry::registry("com.b", None),
            PackageEntry::registry("com.a", Some("1.0")),
        ];
        let missing: Vec<String> = catalog
            .missing(&required, &manifest)
            .iter()
            .map(|e| e.package_id().to_string())
            .collect();
        assert_eq!(missing, vec!["com.c", "com.a"]);
    }
}
