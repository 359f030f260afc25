//! Installer settings document.
//!
//! Lists the packages a project requires, the framework package, the
//! features offered and the registry client policy. Stored as JSON in
//! `Installer/settings.json` under the project root.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::client::ClientPolicy;
use crate::feature::FeatureDefinition;
use crate::package::PackageEntry;
use crate::runtime::{Runtime, write_atomic};

/// Settings location relative to the project root.
pub const SETTINGS_RELATIVE_PATH: &str = "Installer/settings.json";

pub const FRAMEWORK_NAME: &str = "CodeSketch";
pub const FRAMEWORK_URL: &str = "https://github.com/CodeSketch-dev/CodeSketch.git#main";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallerSettings {
    pub always_show_on_startup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<PackageEntry>,
    pub required_packages: Vec<PackageEntry>,
    pub features: Vec<FeatureDefinition>,
    pub client: ClientPolicy,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            always_show_on_startup: true,
            framework: None,
            required_packages: Vec::new(),
            features: Vec::new(),
            client: ClientPolicy::default(),
        }
    }
}

impl InstallerSettings {
    /// Settings written by `init`: the framework package and nothing else.
    pub fn starter() -> Self {
        Self {
            framework: Some(Self::default().framework_entry()),
            ..Default::default()
        }
    }

    /// Load settings from `path`. A missing file yields the defaults.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse settings {:?}", path))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !runtime.exists(parent)
        {
            runtime.create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        write_atomic(runtime, path, json.as_bytes())
    }

    /// Configured framework package, or the built-in one.
    pub fn framework_entry(&self) -> PackageEntry {
        self.framework
            .clone()
            .unwrap_or_else(|| PackageEntry::git(FRAMEWORK_NAME, FRAMEWORK_URL).named(FRAMEWORK_NAME))
    }

    /// Feature with the given label, compared case-insensitively.
    pub fn feature(&self, label: &str) -> Option<&FeatureDefinition> {
        self.features.iter().find(|f| f.label.eq_ignore_ascii_case(label))
    }
}
