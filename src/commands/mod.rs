use anyhow::Result;

use crate::orchestrator::{BatchReport, Operation};

pub mod config;
mod feature;
mod init;
mod provision;
mod status;

pub use config::ProjectOptions;
pub use feature::{apply_feature, features};
pub use init::{init, set_startup};
pub use provision::{install_framework, install_required};
pub use status::status;

fn print_report(report: &BatchReport) {
    let verb = match report.operation {
        Operation::Install => "Installed",
        Operation::Remove => "Removed",
    };
    for entry in &report.processed {
        println!("  {} {}", verb, entry);
    }
    if report.resolved {
        println!("  Resolved packages");
    }
    if let Some(failure) = &report.failure {
        println!("  Failed: {}", failure);
        for entry in &report.remaining {
            println!("  Not processed: {}", entry);
        }
    }
}

/// Turn a finished batch into the command's result.
fn report_result(report: BatchReport) -> Result<()> {
    print_report(&report);
    match report.failure {
        Some(failure) => Err(anyhow::Error::new(failure).context(format!("Batch '{}' did not complete", report.label))),
        None => Ok(()),
    }
}

/// `[x]` for installed/enabled, `[ ]` otherwise.
fn mark(on: bool) -> &'static str {
    if on { "[x]" } else { "[ ]" }
}
