//! Language-specific module builders.
//!
//! Each module language maps to one [`Processor`] variant. A processor
//! compiles or prepares the module on the host (`build`), optionally pushes a
//! language package (`publish`), and names the staged artifact directory
//! that the image build receives as `EXE_DIR`.
//!
//! ```text
//! csharp          → DotNet       dotnet build / dotnet publish
//! java            → Maven        mvn package
//! python, nodejs  → Passthrough  (work happens in the Dockerfile)
//! c               → Passthrough
//! anything else   → UnsupportedLanguage
//! ```

mod dotnet;
mod maven;

pub use dotnet::DotNetProcessor;
pub use maven::MavenProcessor;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{EdgeError, Result};
use crate::module::Language;
use crate::output::Output;

/// Capability interface shared by all builders.
#[async_trait]
pub trait ModuleProcessor: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Compile or prepare the module in its directory.
    async fn build(&self, out: &dyn Output) -> Result<()>;

    /// Language-level publish step, run once before the first image build.
    async fn publish(&self, out: &dyn Output) -> Result<()>;

    /// Artifact directory, relative to the module directory.
    fn exe_dir(&self) -> &str;
}

/// Closed set of supported builders.
#[derive(Debug, Clone)]
pub enum Processor {
    DotNet(DotNetProcessor),
    Maven(MavenProcessor),
    Passthrough(PassthroughProcessor),
}

impl Processor {
    /// Pick the builder for `language`.
    pub fn for_language(
        language: &Language,
        module_dir: &Path,
        build_configuration: &str,
    ) -> Result<Self> {
        match language {
            Language::CSharp => Ok(Self::DotNet(DotNetProcessor::new(
                module_dir,
                build_configuration,
            ))),
            Language::Java => Ok(Self::Maven(MavenProcessor::new(module_dir))),
            Language::Python | Language::NodeJs | Language::C => Ok(Self::Passthrough(
                PassthroughProcessor::new(language.to_string(), module_dir),
            )),
            Language::Other(name) => Err(EdgeError::UnsupportedLanguage(name.clone())),
        }
    }

    fn inner(&self) -> &dyn ModuleProcessor {
        match self {
            Self::DotNet(p) => p,
            Self::Maven(p) => p,
            Self::Passthrough(p) => p,
        }
    }
}

#[async_trait]
impl ModuleProcessor for Processor {
    fn name(&self) -> &str {
        self.inner().name()
    }

    async fn build(&self, out: &dyn Output) -> Result<()> {
        self.inner().build(out).await
    }

    async fn publish(&self, out: &dyn Output) -> Result<()> {
        self.inner().publish(out).await
    }

    fn exe_dir(&self) -> &str {
        self.inner().exe_dir()
    }
}

/// Builder for languages whose Dockerfile does all the work.
#[derive(Debug, Clone)]
pub struct PassthroughProcessor {
    language: String,
    module_dir: PathBuf,
}

impl PassthroughProcessor {
    pub fn new(language: String, module_dir: &Path) -> Self {
        Self {
            language,
            module_dir: module_dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl ModuleProcessor for PassthroughProcessor {
    fn name(&self) -> &str {
        &self.language
    }

    async fn build(&self, _out: &dyn Output) -> Result<()> {
        tracing::debug!(
            language = %self.language,
            module = %self.module_dir.display(),
            "no host build step"
        );
        Ok(())
    }

    async fn publish(&self, _out: &dyn Output) -> Result<()> {
        Ok(())
    }

    fn exe_dir(&self) -> &str {
        "."
    }
}

/// Map a failed host command into a module-scoped build failure.
fn build_failed(step: &str, err: anyhow::Error) -> EdgeError {
    EdgeError::BuildFailed(format!("{}: {:#}", step, err))
}
