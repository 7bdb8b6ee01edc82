//! Allow-list filtering for modules and architectures.

use std::fmt;
use std::io;
use std::path::Path;

/// Marker that selects everything.
pub const WILDCARD: &str = "*";

/// A configured allow-list, or everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every candidate is selected.
    #[default]
    All,
    /// Only candidates named here are selected.
    Only(Vec<String>),
}

impl Selection {
    /// Parse a comma-separated list. Empty input, or a list whose first
    /// entry is `*`, selects everything.
    pub fn parse(raw: &str) -> Self {
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Self::from_list(names)
    }

    /// Build a selection from an already split list.
    pub fn from_list(names: Vec<String>) -> Self {
        match names.first() {
            None => Self::All,
            Some(first) if first == WILDCARD => Self::All,
            Some(_) => Self::Only(names),
        }
    }

    /// Whether `name` passes this selection.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
        }
    }

    /// Filter `candidates`, keeping their order. Names in the allow-list that
    /// are not candidates are ignored.
    pub fn select<I, S>(&self, candidates: I) -> Vec<S>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: Vec<S> = candidates
            .into_iter()
            .filter(|c| self.matches(c.as_ref()))
            .collect();

        if let Self::Only(names) = self {
            for name in names {
                if !selected.iter().any(|s| s.as_ref() == name) {
                    tracing::debug!(%name, "configured name not found, ignoring");
                }
            }
        }
        selected
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(WILDCARD),
            Self::Only(names) => f.write_str(&names.join(",")),
        }
    }
}

/// List module directory names under `root`, sorted by name.
///
/// Hidden directories and plain files are skipped.
pub fn list_modules(root: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_and_empty_select_everything() {
        let all = names(&["sensor", "gateway", "filter"]);
        assert_eq!(Selection::parse("").select(all.clone()), all);
        assert_eq!(Selection::parse("*").select(all.clone()), all);
        // Only the first entry is checked for the wildcard
        assert_eq!(Selection::parse("*,gateway").select(all.clone()), all);
    }

    #[test]
    fn test_subset_keeps_candidate_order() {
        let all = names(&["sensor", "gateway", "filter"]);
        let selection = Selection::parse("filter,sensor");
        assert_eq!(selection.select(all), names(&["sensor", "filter"]));
    }

    #[test]
    fn test_unknown_names_ignored() {
        let all = names(&["sensor", "gateway"]);
        let selection = Selection::parse("ghost,gateway");
        assert_eq!(selection.select(all), names(&["gateway"]));

        let none = Selection::parse("ghost");
        assert!(none.select(names(&["sensor"])).is_empty());
    }

    #[test]
    fn test_select_borrowed_candidates() {
        let keys = ["amd64", "amd64.debug", "arm32v7"];
        let selection = Selection::parse("arm32v7, amd64");
        assert_eq!(selection.select(keys), vec!["amd64", "arm32v7"]);
    }

    #[test]
    fn test_display_roundtrips_config_form() {
        assert_eq!(Selection::All.to_string(), "*");
        assert_eq!(Selection::parse("a, b").to_string(), "a,b");
    }

    #[test]
    fn test_list_modules_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", ".git"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("README.md"), "x").unwrap();

        let listed = list_modules(dir.path()).unwrap();
        assert_eq!(listed, names(&["alpha", "zeta"]));
    }

    #[test]
    fn test_list_modules_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_modules(&dir.path().join("nope")).is_err());
    }
}
