//! Module descriptor (`module.json`) loading.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::Language;
use crate::error::{EdgeError, Result};

/// File name of the per-module descriptor.
pub const DESCRIPTOR_FILE: &str = "module.json";

/// One architecture entry: key and its dockerfile (relative to the module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub arch: String,
    pub dockerfile: String,
}

/// Metadata for one module, read once per run.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub language: Language,
    pub tag_version: String,
    /// In file order, keys unique.
    pub platforms: Vec<Platform>,
    /// Extra options appended to the image build command.
    pub build_options: Vec<String>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    language: Option<Value>,
    image: Option<RawImage>,
}

#[derive(Deserialize)]
struct RawImage {
    tag: Option<RawTag>,
    #[serde(rename = "buildOptions", default)]
    build_options: Option<Value>,
}

#[derive(Deserialize)]
struct RawTag {
    version: Option<Value>,
    platforms: Option<Value>,
}

impl ModuleDescriptor {
    /// Load `module.json` from `module_dir`.
    pub fn load(module_dir: &Path) -> Result<Self> {
        let path = module_dir.join(DESCRIPTOR_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EdgeError::DescriptorNotFound { path });
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content, path)
    }

    /// Parse descriptor text. `path` is only used in error messages.
    pub fn parse(content: &str, path: PathBuf) -> Result<Self> {
        let malformed = |reason: String| EdgeError::DescriptorMalformed {
            path: path.clone(),
            reason,
        };

        let raw: RawDescriptor =
            serde_json::from_str(content).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

        let language = non_empty_str(raw.language.as_ref())
            .ok_or_else(|| malformed("'language' must be a non-empty string".into()))?;

        let image = raw
            .image
            .ok_or_else(|| malformed("missing 'image' section".into()))?;
        let tag = image
            .tag
            .ok_or_else(|| malformed("missing 'image.tag' section".into()))?;

        let tag_version = non_empty_str(tag.version.as_ref())
            .ok_or_else(|| malformed("'image.tag.version' must be a non-empty string".into()))?;
        // Goes verbatim into image tags
        if tag.version.as_ref().and_then(Value::as_str) != Some(tag_version.as_str()) {
            return Err(malformed(
                "'image.tag.version' must not have surrounding whitespace".into(),
            ));
        }

        let platforms = match tag.platforms {
            Some(Value::Object(map)) => {
                let mut platforms = Vec::with_capacity(map.len());
                for (arch, dockerfile) in map {
                    let dockerfile = non_empty_str(Some(&dockerfile)).ok_or_else(|| {
                        malformed(format!("platform '{}' needs a non-empty dockerfile path", arch))
                    })?;
                    platforms.push(Platform { arch, dockerfile });
                }
                platforms
            }
            Some(_) => return Err(malformed("'image.tag.platforms' must be an object".into())),
            None => return Err(malformed("missing 'image.tag.platforms'".into())),
        };
        if platforms.is_empty() {
            return Err(malformed("'image.tag.platforms' has no entries".into()));
        }

        let build_options = match image.build_options {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(String::from)
                        .ok_or_else(|| malformed("'image.buildOptions' must hold strings".into()))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(malformed("'image.buildOptions' must be an array".into())),
        };

        Ok(Self {
            language: Language::from(language.as_str()),
            tag_version,
            platforms,
            build_options,
        })
    }

    /// Dockerfile path for `arch`, if the module declares it.
    pub fn dockerfile_for(&self, arch: &str) -> Option<&str> {
        self.platforms
            .iter()
            .find(|p| p.arch == arch)
            .map(|p| p.dockerfile.as_str())
    }

    /// Architecture keys in descriptor order.
    pub fn arch_keys(&self) -> impl Iterator<Item = &str> {
        self.platforms.iter().map(|p| p.arch.as_str())
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
