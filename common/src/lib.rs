//! Core of `darsync`: audit a directory before moving it to a remote cluster and generate the
//! batch script that moves it.
//!
//! - [`audit`] walks the directory, collects uncompressed files and checks size thresholds
//! - [`report`] writes the ranked list of flagged files (and the generated script) to disk
//! - [`script`] renders the SLURM transfer script
//! - [`size`] formats byte counts for humans
//! - [`validate`] and [`naming`] check the transfer parameters and name the files of a run

pub mod audit;
pub mod config;
pub mod naming;
pub mod report;
pub mod script;
pub mod size;
pub mod validate;

#[cfg(test)]
mod testutils;

pub use audit::{AuditError, AuditEvent, AuditResult, FileRecord, audit, audit_with};
pub use config::{AuditSettings, ExtensionMatch, OutputConfig, SlurmDirectives};
pub use report::{ReportError, write_report, write_script};
pub use script::{LargeDirPolicy, ScriptOptions, TransferParameters, render};
pub use size::format_bytes;

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.level_directive()));
    // a subscriber may already be installed (e.g. by a test harness)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Set up logging and run `func`, logging its error chain on failure
///
/// Returns `None` if `func` failed; the caller decides on the exit code.
pub fn run<T, F>(output: OutputConfig, func: F) -> Option<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    init_tracing(&output);
    match func() {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::error!("{:#}", error);
            None
        }
    }
}
