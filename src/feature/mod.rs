//! Feature definitions.
//!
//! A feature is either a toggle (a set of defines plus optional packages,
//! all on or all off) or a list of mutually exclusive options, each with an
//! optional define and its own packages.

mod resolver;

pub use resolver::{FeatureChange, FeatureResolver, FeatureState, FeatureStatus};

use serde::{Deserialize, Serialize};

use crate::package::PackageEntry;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeatureDefinition {
    pub label: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    Toggle(ToggleFeature),
    Options(OptionsFeature),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ToggleFeature {
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OptionsFeature {
    #[serde(default)]
    pub options: Vec<FeatureOption>,
    #[serde(default)]
    pub default_index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub define: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

impl FeatureDefinition {
    pub fn toggle(label: impl Into<String>, defines: &[&str], packages: Vec<PackageEntry>) -> Self {
        Self {
            label: label.into(),
            kind: FeatureKind::Toggle(ToggleFeature {
                defines: defines.iter().map(|d| d.to_string()).collect(),
                packages,
            }),
        }
    }

    pub fn options(label: impl Into<String>, options: Vec<FeatureOption>, default_index: usize) -> Self {
        Self {
            label: label.into(),
            kind: FeatureKind::Options(OptionsFeature {
                options,
                default_index,
            }),
        }
    }
}

impl FeatureOption {
    pub fn new(label: impl Into<String>, define: Option<&str>, packages: Vec<PackageEntry>) -> Self {
        Self {
            label: label.into(),
            define: define.filter(|d| !d.is_empty()).map(str::to_string),
            packages,
        }
    }

    /// The define symbol, ignoring blank values from hand-edited settings.
    pub fn define(&self) -> Option<&str> {
        self.define.as_deref().filter(|d| !d.is_empty())
    }
}

impl OptionsFeature {
    /// `default_index` clamped into range. `None` when there are no options.
    pub fn clamped_default(&self) -> Option<usize> {
        let last = self.options.len().checked_sub(1)?;
        Some(self.default_index.min(last))
    }

    /// Index of the option with the given label, compared case-insensitively.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|o| o.label.eq_ignore_ascii_case(label))
    }
}
