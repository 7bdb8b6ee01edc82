//! Preflight checks for edgebuild.
//!
//! Validates host tools, module descriptors and registry settings before a
//! build. Run with `edgebuild preflight` to check everything is ready.

mod environment;
mod host_tools;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::output::Output;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(config: &Config, out: &dyn Output) -> PreflightReport {
    let mut checks = Vec::new();

    out.info("Checking modules...", false);
    let (module_checks, languages) = environment::check_modules(config);
    checks.extend(module_checks);

    out.info("Checking host tools...", false);
    checks.extend(host_tools::check_host_tools(&languages));

    out.info("Checking registry...", false);
    checks.push(environment::check_registry(config));

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(config: &Config, out: &dyn Output) -> Result<()> {
    let report = run_preflight(config, out);
    report.print(out);

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    out.info("All preflight checks passed!", false);
    Ok(())
}
