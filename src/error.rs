//! Error taxonomy for the build/publish pipeline.
//!
//! Errors are scoped: descriptor, language and builder errors abort one
//! module; image build and push errors abort one architecture. Nothing here
//! is fatal to a run on its own; the pipeline decides what to skip.

use std::path::PathBuf;

/// Errors raised while processing a single module or architecture.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    #[error("module descriptor not found: {}", path.display())]
    DescriptorNotFound { path: PathBuf },

    #[error("module descriptor {} is malformed: {reason}", path.display())]
    DescriptorMalformed { path: PathBuf, reason: String },

    #[error("unsupported module language '{0}'")]
    UnsupportedLanguage(String),

    #[error("module build failed: {0}")]
    BuildFailed(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EdgeError {
    /// Descriptor errors are the only ones that make the CLI exit non-zero.
    pub fn is_descriptor_error(&self) -> bool {
        matches!(
            self,
            Self::DescriptorNotFound { .. } | Self::DescriptorMalformed { .. }
        )
    }
}

/// Errors raised by a [`crate::registry::RegistryClient`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("image build failed for {tag}: {reason}")]
    ImageBuildFailed { tag: String, reason: String },

    #[error("image push failed for {tag}: {reason}")]
    ImagePushFailed { tag: String, reason: String },

    #[error("missing credentials for registry {server}")]
    MissingCredentials { server: String },
}

pub type Result<T, E = EdgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_errors_are_flagged() {
        let not_found = EdgeError::DescriptorNotFound {
            path: PathBuf::from("modules/a/module.json"),
        };
        let malformed = EdgeError::DescriptorMalformed {
            path: PathBuf::from("modules/a/module.json"),
            reason: "missing language".into(),
        };
        assert!(not_found.is_descriptor_error());
        assert!(malformed.is_descriptor_error());
        assert!(!EdgeError::BuildFailed("dotnet".into()).is_descriptor_error());
        assert!(!EdgeError::UnsupportedLanguage("cobol".into()).is_descriptor_error());
    }

    #[test]
    fn test_registry_error_messages_name_the_tag() {
        let err: EdgeError = RegistryError::ImagePushFailed {
            tag: "myreg.io/sensor:1.0.0-amd64".into(),
            reason: "denied".into(),
        }
        .into();
        assert!(err.to_string().contains("myreg.io/sensor:1.0.0-amd64"));
        assert!(err.to_string().contains("denied"));
    }
}
