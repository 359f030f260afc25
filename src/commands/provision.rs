use anyhow::Result;
use log::debug;

use crate::runtime::Runtime;

use super::config::{Config, ProjectOptions};
use super::report_result;

/// Install every required package that is not installed yet.
#[tracing::instrument(skip(runtime, options))]
pub async fn install_required<R: Runtime>(runtime: R, options: ProjectOptions) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let settings = config.settings()?;
    let orchestrator = config.orchestrator(settings.client);
    orchestrator.refresh_catalog().await?;

    let missing = orchestrator.missing(&settings.required_packages);
    if missing.is_empty() {
        println!("All required packages are installed.");
        return Ok(());
    }
    debug!("{} required package(s) missing", missing.len());

    println!("Installing {} required package(s)...", missing.len());
    let report = orchestrator.install_missing(&settings.required_packages).await?;
    report_result(report)
}

/// Install the framework package unless it is already present.
#[tracing::instrument(skip(runtime, options))]
pub async fn install_framework<R: Runtime>(runtime: R, options: ProjectOptions) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let settings = config.settings()?;
    let framework = settings.framework_entry();
    let orchestrator = config.orchestrator(settings.client);
    orchestrator.refresh_catalog().await?;

    if orchestrator.is_installed(&framework) {
        println!("{} is already installed.", framework);
        return Ok(());
    }

    println!("Installing {}...", framework);
    let report = orchestrator.install_framework(&framework).await?;
    report_result(report)
}
