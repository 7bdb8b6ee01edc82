//! Module tree and registry configuration checks.

use crate::config::Config;
use crate::module::{list_modules, Language, ModuleDescriptor};
use crate::registry::is_local_registry;

use super::types::CheckResult;

/// Check the modules directory and every selected module's descriptor.
///
/// Returns the check results plus the languages of the modules that loaded,
/// so tool checks can be limited to what is actually used.
pub fn check_modules(config: &Config) -> (Vec<CheckResult>, Vec<Language>) {
    let mut results = Vec::new();
    let mut languages = Vec::new();
    let root = &config.modules_path;

    let all = match list_modules(root) {
        Ok(all) => all,
        Err(e) => {
            results.push(CheckResult::fail(
                "modules directory",
                format!("Cannot read {}: {}", root.display(), e),
            ));
            return (results, languages);
        }
    };

    let selected = config.active_modules.select(all);
    if selected.is_empty() {
        results.push(CheckResult::warn(
            "modules directory",
            format!("No modules selected in {} (ACTIVE_MODULES={})", root.display(), config.active_modules),
        ));
        return (results, languages);
    }
    results.push(CheckResult::pass_with(
        "modules directory",
        format!("{} module(s) selected", selected.len()),
    ));

    for name in selected {
        let dir = root.join(&name);
        let descriptor = match ModuleDescriptor::load(&dir) {
            Ok(d) => d,
            Err(e) => {
                results.push(CheckResult::fail(format!("module {}", name), e.to_string()));
                continue;
            }
        };

        let missing: Vec<&str> = config
            .active_platforms
            .select(descriptor.arch_keys())
            .into_iter()
            .filter(|arch| {
                descriptor
                    .dockerfile_for(arch)
                    .is_some_and(|f| !dir.join(f).is_file())
            })
            .collect();

        if missing.is_empty() {
            results.push(CheckResult::pass_with(
                format!("module {}", name),
                format!("{} v{}", descriptor.language, descriptor.tag_version),
            ));
        } else {
            results.push(CheckResult::warn(
                format!("module {}", name),
                format!("dockerfile missing for: {}", missing.join(", ")),
            ));
        }

        if !languages.contains(&descriptor.language) {
            languages.push(descriptor.language);
        }
    }

    (results, languages)
}

/// Check that pushes to the configured registry can authenticate.
pub fn check_registry(config: &Config) -> CheckResult {
    let name = format!("registry {}", config.registry_server);
    if is_local_registry(&config.registry_server) {
        return CheckResult::pass_with(name, "local registry, no login needed");
    }
    if config.registry_username.is_empty() || config.registry_password.is_empty() {
        CheckResult::warn(
            name,
            "CONTAINER_REGISTRY_USERNAME/CONTAINER_REGISTRY_PASSWORD not set - push will be skipped",
        )
    } else {
        CheckResult::pass_with(name, format!("user {}", config.registry_username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::types::CheckStatus;
    use std::collections::HashMap;
    use std::fs;

    fn config_for(root: &std::path::Path, extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert("MODULES_PATH".into(), root.display().to_string());
        Config::from_vars(root, &vars)
    }

    #[test]
    fn test_check_modules_reports_each_module() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good");
        fs::create_dir(&good).unwrap();
        fs::write(
            good.join("module.json"),
            r#"{"language":"csharp","image":{"tag":{"version":"1.0","platforms":{"amd64":"Dockerfile"}}}}"#,
        )
        .unwrap();
        fs::write(good.join("Dockerfile"), "FROM scratch").unwrap();
        fs::create_dir(dir.path().join("broken")).unwrap();

        let (results, languages) = check_modules(&config_for(dir.path(), &[]));

        let status = |name: &str| results.iter().find(|r| r.name == name).unwrap().status;
        assert_eq!(status("modules directory"), CheckStatus::Pass);
        assert_eq!(status("module good"), CheckStatus::Pass);
        assert_eq!(status("module broken"), CheckStatus::Fail);
        assert_eq!(languages, vec![Language::CSharp]);
    }

    #[test]
    fn test_check_registry() {
        let dir = tempfile::tempdir().unwrap();
        let local = config_for(dir.path(), &[]);
        assert_eq!(check_registry(&local).status, CheckStatus::Pass);

        let remote = config_for(dir.path(), &[("CONTAINER_REGISTRY_SERVER", "myreg.io")]);
        assert_eq!(check_registry(&remote).status, CheckStatus::Warn);
    }
}
