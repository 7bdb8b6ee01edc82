//! Image tag computation.

use std::fmt;

/// Fully qualified image name for one (module, architecture) pair.
///
/// Rendered as `registry/module:version[-suffix]-architecture`, lower-cased.
/// The same inputs always give the same tag, which is what lets a
/// build-only run and a later push-only run agree on image names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageTarget {
    tag: String,
}

impl ImageTarget {
    pub fn new(
        registry: &str,
        module: &str,
        tag_version: &str,
        container_tag: &str,
        architecture: &str,
    ) -> Self {
        let version = if container_tag.is_empty() {
            tag_version.to_string()
        } else {
            format!("{}-{}", tag_version, container_tag)
        };
        let tag = format!("{}/{}:{}-{}", registry, module, version, architecture).to_lowercase();
        Self { tag }
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl AsRef<str> for ImageTarget {
    fn as_ref(&self) -> &str {
        &self.tag
    }
}
