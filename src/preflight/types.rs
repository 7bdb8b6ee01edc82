//! Preflight check types and report.

use crate::output::Output;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - the run will not work.
    Fail,
    /// Check passed but with a warning.
    Warn,
    /// Check not applicable to the selected modules.
    Skip,
}

impl CheckStatus {
    fn label(self) -> (&'static str, &'static str) {
        match self {
            Self::Pass => ("✓", "PASS"),
            Self::Fail => ("✗", "FAIL"),
            Self::Warn => ("⚠", "WARN"),
            Self::Skip => ("○", "SKIP"),
        }
    }
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, details: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            details,
        }
    }

    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details.into()))
    }

    pub fn fail(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details.into()))
    }

    pub fn warn(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details.into()))
    }

    pub fn skip(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Skip, Some(details.into()))
    }
}

/// Results of all preflight checks.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if no check failed.
    pub fn all_passed(&self) -> bool {
        self.count(CheckStatus::Fail) == 0
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    /// Print the report.
    pub fn print(&self, out: &dyn Output) {
        out.header("Preflight Check Results", false);

        for check in &self.checks {
            let (icon, label) = check.status.label();
            let line = match &check.details {
                Some(details) => format!("  {} [{}] {}: {}", icon, label, check.name, details),
                None => format!("  {} [{}] {}", icon, label, check.name),
            };
            out.info(&line, false);
        }

        out.info(
            &format!(
                "\nSummary: {}/{} passed",
                self.count(CheckStatus::Pass),
                self.checks.len()
            ),
            false,
        );
        let failed = self.fail_count();
        if failed > 0 {
            out.info(&format!("         {} FAILED - builds will not succeed", failed), false);
        }
        let warned = self.count(CheckStatus::Warn);
        if warned > 0 {
            out.info(&format!("         {} warnings", warned), false);
        }
    }
}
