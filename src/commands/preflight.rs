//! Preflight command - runs preflight checks.

use anyhow::Result;

use crate::config::Config;
use crate::output::Output;
use crate::preflight;

/// Execute the preflight command.
pub fn cmd_preflight(config: &Config, strict: bool, out: &dyn Output) -> Result<()> {
    if strict {
        preflight::run_preflight_or_fail(config, out)?;
    } else {
        let report = preflight::run_preflight(config, out);
        report.print(out);
        if !report.all_passed() {
            out.info("Some checks failed. Use --strict to exit non-zero.", false);
        }
    }
    Ok(())
}
