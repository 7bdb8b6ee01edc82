//! Host tool availability checks.

use crate::module::Language;
use crate::process;

use super::types::CheckResult;

/// Check the container CLI and the language toolchains the modules need.
pub fn check_host_tools(languages: &[Language]) -> Vec<CheckResult> {
    let mut results = vec![check_tool_exists(
        "docker",
        "Required to build and push module images",
        true,
    )];

    // Toolchains only matter if a selected module uses them
    let toolchains = [
        (Language::CSharp, "dotnet", "Required to build csharp modules"),
        (Language::Java, "mvn", "Required to build java modules"),
    ];

    for (language, tool, purpose) in toolchains {
        if languages.contains(&language) {
            results.push(check_tool_exists(tool, purpose, false));
        } else {
            results.push(CheckResult::skip(tool, format!("no {} modules selected", language)));
        }
    }

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, path),
        None => {
            let msg = format!("Not found in PATH. {}", purpose);
            if required {
                CheckResult::fail(tool, msg)
            } else {
                CheckResult::warn(tool, msg)
            }
        }
    }
}
