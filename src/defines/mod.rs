//! Compiler define symbols.
//!
//! Features are switched on and off through define symbols stored per build
//! target by the host. [`DefineSymbols`] is the seam the feature resolver
//! talks to; [`ProjectDefineStore`] keeps them in a JSON document inside the
//! project so the CLI can manage them without the host running.

mod store;

pub use store::{DEFINES_RELATIVE_PATH, ProjectDefineStore};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Build targets that receive define changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum BuildTarget {
    #[default]
    Standalone,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "WebGL")]
    WebGl,
}

impl BuildTarget {
    pub const ALL: [BuildTarget; 4] = [
        BuildTarget::Standalone,
        BuildTarget::Android,
        BuildTarget::Ios,
        BuildTarget::WebGl,
    ];
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildTarget::Standalone => "Standalone",
            BuildTarget::Android => "Android",
            BuildTarget::Ios => "iOS",
            BuildTarget::WebGl => "WebGL",
        };
        f.write_str(name)
    }
}

/// Define-symbol storage.
#[cfg_attr(test, mockall::automock)]
pub trait DefineSymbols: Send + Sync {
    /// Add (`enabled`) or remove every symbol on every build target.
    fn set_defines(&self, symbols: &[String], enabled: bool) -> Result<()>;

    /// Whether `symbol` is defined for the currently selected build target.
    fn has_define(&self, symbol: &str) -> bool;
}
