use anyhow::{Context, Result, bail};
use log::debug;
use std::path::PathBuf;

use crate::{
    client::{ClientPolicy, ManifestClient},
    defines::ProjectDefineStore,
    manifest::ManifestStore,
    orchestrator::Orchestrator,
    runtime::Runtime,
    settings::{InstallerSettings, SETTINGS_RELATIVE_PATH},
};

/// Locations given on the command line (or through the environment).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    pub project: Option<PathBuf>,
    pub settings: Option<PathBuf>,
}

impl ProjectOptions {
    pub fn new(project: Option<PathBuf>, settings: Option<PathBuf>) -> Self {
        Self { project, settings }
    }
}

/// Resolved project paths plus the runtime every command works through.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub project_root: PathBuf,
    pub settings_path: PathBuf,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, options: ProjectOptions) -> Result<Self> {
        let project_root = match options.project {
            Some(path) => path,
            None => runtime
                .current_dir()
                .context("Cannot determine the project directory")?,
        };
        if !runtime.is_dir(&project_root) {
            bail!("Project directory {:?} does not exist", project_root);
        }
        let settings_path = options
            .settings
            .unwrap_or_else(|| project_root.join(SETTINGS_RELATIVE_PATH));
        debug!("Project {:?}, settings {:?}", project_root, settings_path);

        Ok(Self {
            runtime,
            project_root,
            settings_path,
        })
    }

    pub fn settings(&self) -> Result<InstallerSettings> {
        InstallerSettings::load(&self.runtime, &self.settings_path)
    }

    pub fn manifest(&self) -> ManifestStore<'_, R> {
        ManifestStore::for_project(&self.runtime, &self.project_root)
    }

    pub fn defines(&self) -> ProjectDefineStore<'_, R> {
        ProjectDefineStore::for_project(&self.runtime, &self.project_root)
    }

    /// Orchestrator driving the manifest-backed registry client.
    pub fn orchestrator(&self, policy: ClientPolicy) -> Orchestrator<'_, R, ManifestClient<'_, R>> {
        Orchestrator::new(
            self.manifest(),
            ManifestClient::new(&self.runtime, &self.project_root),
            policy,
        )
    }
}
