use anyhow::{Result, anyhow, bail};

use crate::{
    feature::{FeatureChange, FeatureKind, FeatureResolver, FeatureState},
    runtime::Runtime,
};

use super::config::{Config, ProjectOptions};
use super::{mark, report_result};

/// List the configured features and their current values.
#[tracing::instrument(skip(runtime, options))]
pub async fn features<R: Runtime>(runtime: R, options: ProjectOptions) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let settings = config.settings()?;
    if settings.features.is_empty() {
        println!("No features configured.");
        return Ok(());
    }

    let orchestrator = config.orchestrator(settings.client);
    let defines = config.defines();
    let resolver = FeatureResolver::new(&orchestrator, &defines);

    for (feature, status) in settings.features.iter().zip(resolver.describe(&settings.features)) {
        match (&feature.kind, &status.state) {
            (FeatureKind::Options(options), FeatureState::Option { index: current, .. }) => {
                println!("{}:", feature.label);
                for (index, option) in options.options.iter().enumerate() {
                    println!("  {} {} {}", mark(index == *current), index, option.label);
                }
            }
            _ => println!("{}: {}", feature.label, status.state),
        }
    }
    Ok(())
}

/// Set a feature: `on`/`off` for toggles, an option label or index otherwise.
#[tracing::instrument(skip(runtime, options))]
pub async fn apply_feature<R: Runtime>(runtime: R, options: ProjectOptions, label: &str, value: &str) -> Result<()> {
    let config = Config::new(runtime, options)?;
    let settings = config.settings()?;
    let feature = settings
        .feature(label)
        .ok_or_else(|| anyhow!("No feature named '{}' in {:?}", label, config.settings_path))?;

    let orchestrator = config.orchestrator(settings.client);
    let defines = config.defines();
    let resolver = FeatureResolver::new(&orchestrator, &defines);

    let change = match &feature.kind {
        FeatureKind::Toggle(toggle) => {
            resolver
                .apply_toggle(&feature.label, toggle, parse_switch(value)?)
                .await?
        }
        FeatureKind::Options(options) => resolver.apply_option_choice(&feature.label, options, value).await?,
    };

    match change {
        FeatureChange::Unchanged => {
            println!("{} is already {}.", feature.label, resolver.state(feature));
            Ok(())
        }
        FeatureChange::Applied { batches } => {
            println!("{}: {}", feature.label, resolver.state(feature));
            batches.into_iter().try_for_each(report_result)
        }
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "enable" | "enabled" | "yes" | "1" => Ok(true),
        "off" | "false" | "disable" | "disabled" | "no" | "0" => Ok(false),
        _ => bail!("Expected on or off, got '{}'", value),
    }
}
