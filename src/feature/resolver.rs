use anyhow::{Result, anyhow, bail};
use log::{debug, info};
use std::fmt;

use super::{FeatureDefinition, FeatureKind, OptionsFeature, ToggleFeature};
use crate::client::RegistryClient;
use crate::defines::DefineSymbols;
use crate::orchestrator::{Batch, BatchReport, Orchestrator, ProvisionError};
use crate::runtime::Runtime;

/// What applying a feature value did.
#[derive(Debug)]
pub enum FeatureChange {
    /// The requested value was already current; nothing was touched.
    Unchanged,
    /// Defines were rewritten and the listed batches ran, in order.
    Applied { batches: Vec<BatchReport> },
}

impl FeatureChange {
    pub fn is_success(&self) -> bool {
        match self {
            FeatureChange::Unchanged => true,
            FeatureChange::Applied { batches } => batches.iter().all(BatchReport::is_success),
        }
    }
}

/// Current value of one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureState {
    Toggle(bool),
    Option { index: usize, label: String },
    /// An options feature with nothing to choose from.
    Empty,
}

impl fmt::Display for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureState::Toggle(true) => write!(f, "on"),
            FeatureState::Toggle(false) => write!(f, "off"),
            FeatureState::Option { index, label } => write!(f, "[{}] {}", index, label),
            FeatureState::Empty => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStatus {
    pub label: String,
    pub state: FeatureState,
}

/// Translates feature changes into define writes and package batches.
pub struct FeatureResolver<'r, 'a, R: Runtime, C: RegistryClient, D: DefineSymbols> {
    orchestrator: &'r Orchestrator<'a, R, C>,
    defines: &'r D,
}

impl<'r, 'a, R: Runtime, C: RegistryClient, D: DefineSymbols> FeatureResolver<'r, 'a, R, C, D> {
    pub fn new(orchestrator: &'r Orchestrator<'a, R, C>, defines: &'r D) -> Self {
        Self { orchestrator, defines }
    }

    /// On when the toggle has defines and every one of them is present.
    pub fn toggle_state(&self, toggle: &ToggleFeature) -> bool {
        !toggle.defines.is_empty() && toggle.defines.iter().all(|d| self.defines.has_define(d))
    }

    /// First option whose define is present, else the clamped default.
    pub fn current_option_index(&self, options: &OptionsFeature) -> Option<usize> {
        options
            .options
            .iter()
            .position(|o| o.define().is_some_and(|d| self.defines.has_define(d)))
            .or_else(|| options.clamped_default())
    }

    pub fn state(&self, feature: &FeatureDefinition) -> FeatureState {
        match &feature.kind {
            FeatureKind::Toggle(toggle) => FeatureState::Toggle(self.toggle_state(toggle)),
            FeatureKind::Options(options) => match self.current_option_index(options) {
                Some(index) => FeatureState::Option {
                    index,
                    label: options.options[index].label.clone(),
                },
                None => FeatureState::Empty,
            },
        }
    }

    pub fn describe(&self, features: &[FeatureDefinition]) -> Vec<FeatureStatus> {
        features
            .iter()
            .map(|feature| FeatureStatus {
                label: feature.label.clone(),
                state: self.state(feature),
            })
            .collect()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.orchestrator.is_busy() {
            return Err(ProvisionError::Busy.into());
        }
        Ok(())
    }

    /// Switch a toggle feature on or off.
    #[tracing::instrument(skip(self, toggle))]
    pub async fn apply_toggle(&self, label: &str, toggle: &ToggleFeature, enabled: bool) -> Result<FeatureChange> {
        self.ensure_idle()?;
        if self.toggle_state(toggle) == enabled {
            debug!("{} is already {}", label, if enabled { "on" } else { "off" });
            return Ok(FeatureChange::Unchanged);
        }

        if !toggle.defines.is_empty() {
            self.defines.set_defines(&toggle.defines, enabled)?;
        }
        info!("{} turned {}", label, if enabled { "on" } else { "off" });

        let mut batches = Vec::new();
        if !toggle.packages.is_empty() {
            let batch = if enabled {
                Batch::install(label, toggle.packages.clone())
            } else {
                Batch::remove(label, toggle.packages.clone())
            };
            batches.push(self.orchestrator.run_batch(batch).await?);
        }
        Ok(FeatureChange::Applied { batches })
    }

    /// Select the option at `index`.
    ///
    /// The previous option is torn down first (define cleared, packages
    /// removed to completion). If that removal fails the new option is not
    /// applied.
    #[tracing::instrument(skip(self, options))]
    pub async fn apply_option(&self, label: &str, options: &OptionsFeature, index: usize) -> Result<FeatureChange> {
        self.ensure_idle()?;
        let current = self
            .current_option_index(options)
            .ok_or_else(|| anyhow!("Feature {} has no options", label))?;
        let Some(next) = options.options.get(index) else {
            bail!(
                "Feature {} has no option {} (valid: 0..{})",
                label,
                index,
                options.options.len()
            );
        };
        if index == current {
            debug!("{} already set to {}", label, next.label);
            return Ok(FeatureChange::Unchanged);
        }
        let previous = &options.options[current];
        let mut batches = Vec::new();

        if let Some(define) = previous.define() {
            self.defines.set_defines(&[define.to_string()], false)?;
        }
        if !previous.packages.is_empty() {
            let report = self
                .orchestrator
                .run_batch(Batch::remove(format!("{}: {}", label, previous.label), previous.packages.clone()))
                .await?;
            let failed = !report.is_success();
            batches.push(report);
            if failed {
                return Ok(FeatureChange::Applied { batches });
            }
        }

        if let Some(define) = next.define() {
            self.defines.set_defines(&[define.to_string()], true)?;
        }
        if !next.packages.is_empty() {
            batches.push(
                self.orchestrator
                    .run_batch(Batch::install(format!("{}: {}", label, next.label), next.packages.clone()))
                    .await?,
            );
        }
        info!("{} switched from {} to {}", label, previous.label, next.label);
        Ok(FeatureChange::Applied { batches })
    }

    /// Select an option by label, or by index when `choice` is a number.
    pub async fn apply_option_choice(&self, label: &str, options: &OptionsFeature, choice: &str) -> Result<FeatureChange> {
        let index = match choice.parse::<usize>() {
            Ok(index) => index,
            Err(_) => options
                .position(choice)
                .ok_or_else(|| anyhow!("Feature {} has no option named {}", label, choice))?,
        };
        self.apply_option(label, options, index).await
    }
}
