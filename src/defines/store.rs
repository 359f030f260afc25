use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{BuildTarget, DefineSymbols};
use crate::runtime::{Runtime, write_atomic};

/// Define document location relative to the project root.
pub const DEFINES_RELATIVE_PATH: &str = "ProjectSettings/ScriptingDefines.json";

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct DefineDocument {
    #[serde(default)]
    selected_target: BuildTarget,
    #[serde(default)]
    targets: BTreeMap<BuildTarget, Vec<String>>,
}

impl DefineDocument {
    /// Apply one symbol to every build target. Returns whether anything changed.
    fn apply(&mut self, symbol: &str, enabled: bool) -> bool {
        let mut changed = false;
        for target in BuildTarget::ALL {
            let defines = self.targets.entry(target).or_default();
            let present = defines.iter().any(|d| d == symbol);
            if enabled && !present {
                defines.push(symbol.to_string());
                changed = true;
            } else if !enabled && present {
                defines.retain(|d| d != symbol);
                changed = true;
            }
        }
        changed
    }
}

/// Define symbols persisted in `ProjectSettings/ScriptingDefines.json`.
///
/// The document is read on every call so edits made by the host between
/// calls are picked up.
pub struct ProjectDefineStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> ProjectDefineStore<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self { runtime, path }
    }

    pub fn for_project(runtime: &'a R, project_root: &Path) -> Self {
        Self::new(runtime, project_root.join(DEFINES_RELATIVE_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DefineDocument> {
        if !self.runtime.exists(&self.path) {
            return Ok(DefineDocument::default());
        }
        let content = self.runtime.read_to_string(&self.path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", self.path))
    }

    fn save(&self, document: &DefineDocument) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');
        write_atomic(self.runtime, &self.path, json.as_bytes())
    }

    pub fn selected_target(&self) -> Result<BuildTarget> {
        Ok(self.load()?.selected_target)
    }

    /// Symbols defined for the selected build target, in stored order.
    pub fn selected_defines(&self) -> Result<Vec<String>> {
        let mut document = self.load()?;
        let selected = document.selected_target;
        Ok(document.targets.remove(&selected).unwrap_or_default())
    }
}

impl<R: Runtime> DefineSymbols for ProjectDefineStore<'_, R> {
    #[tracing::instrument(skip(self))]
    fn set_defines(&self, symbols: &[String], enabled: bool) -> Result<()> {
        let mut document = self.load()?;
        let mut changed = false;
        for symbol in symbols.iter().filter(|s| !s.is_empty()) {
            changed |= document.apply(symbol, enabled);
        }

        if !changed {
            debug!("Defines {:?} already {}", symbols, if enabled { "set" } else { "cleared" });
            return Ok(());
        }
        self.save(&document)?;
        info!("{} defines {:?}", if enabled { "Set" } else { "Cleared" }, symbols);
        Ok(())
    }

    fn has_define(&self, symbol: &str) -> bool {
        match self.load() {
            Ok(document) => document
                .targets
                .get(&document.selected_target)
                .is_some_and(|defines| defines.iter().any(|d| d == symbol)),
            Err(e) => {
                warn!("Treating {} as undefined: {:#}", symbol, e);
                false
            }
        }
    }
}
