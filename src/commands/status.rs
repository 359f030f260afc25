use anyhow::Result;
use log::warn;

use crate::{feature::FeatureResolver, runtime::Runtime};

use super::config::{Config, ProjectOptions};
use super::mark;

/// Show what is installed, what is missing and how features are set.
#[tracing::instrument(skip(runtime, options))]
pub async fn status<R: Runtime>(runtime: R, options: ProjectOptions) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let settings = config.settings()?;
    let manifest = config.manifest();

    println!("Project: {}", config.project_root.display());
    println!(
        "Always show on startup: {}",
        if settings.always_show_on_startup { "on" } else { "off" }
    );
    if !manifest.exists() {
        println!("No package manifest at {}", manifest.path().display());
        return Ok(());
    }

    let orchestrator = config.orchestrator(settings.client);
    orchestrator.refresh_catalog().await?;

    let framework = settings.framework_entry();
    println!("\nFramework:");
    println!("  {} {}", mark(orchestrator.is_installed(&framework)), framework);

    println!("\nRequired packages:");
    if settings.required_packages.is_empty() {
        println!("  (none)");
    }
    for entry in &settings.required_packages {
        println!("  {} {}", mark(orchestrator.is_installed(entry)), entry);
    }

    let defines = config.defines();
    let resolver = FeatureResolver::new(&orchestrator, &defines);
    println!("\nFeatures:");
    if settings.features.is_empty() {
        println!("  (none)");
    }
    for feature in resolver.describe(&settings.features) {
        println!("  {}: {}", feature.label, feature.state);
    }

    let registries = orchestrator.manifest().scoped_registries()?;
    if !registries.is_empty() {
        println!("\nScoped registries:");
        for registry in &registries {
            println!("  {} {} [{}]", registry.name, registry.url, registry.scopes.join(", "));
        }
    }
    for scope in orchestrator.manifest().conflicting_scopes()? {
        warn!("Scope {} is claimed by more than one scoped registry", scope);
    }

    if !orchestrator.missing(&settings.required_packages).is_empty() {
        println!("\nRun `provisor install-required` to install the missing packages.");
    }
    Ok(())
}
