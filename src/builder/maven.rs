//! Java module builder.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{build_failed, ModuleProcessor};
use crate::error::{EdgeError, Result};
use crate::output::Output;
use crate::process::Cmd;

/// Builds Java modules with Maven. The jar lands in `target/`.
#[derive(Debug, Clone)]
pub struct MavenProcessor {
    module_dir: PathBuf,
}

impl MavenProcessor {
    pub fn new(module_dir: &Path) -> Self {
        Self {
            module_dir: module_dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl ModuleProcessor for MavenProcessor {
    fn name(&self) -> &str {
        "maven"
    }

    async fn build(&self, out: &dyn Output) -> Result<()> {
        let pom = self.module_dir.join("pom.xml");
        if !pom.is_file() {
            return Err(EdgeError::BuildFailed(format!(
                "pom.xml not found in {}",
                self.module_dir.display()
            )));
        }
        out.info(&format!("BUILDING MAVEN PROJECT: {}", pom.display()), false);

        Cmd::new("mvn")
            .args(["-q", "package"])
            .dir(&self.module_dir)
            .error_msg("mvn package failed")
            .run()
            .await
            .map_err(|e| build_failed("mvn package", e))?;
        Ok(())
    }

    async fn publish(&self, _out: &dyn Output) -> Result<()> {
        Ok(())
    }

    fn exe_dir(&self) -> &str {
        "target"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ConsoleOutput;

    #[tokio::test]
    async fn test_build_requires_pom() {
        let dir = tempfile::tempdir().unwrap();
        let err = MavenProcessor::new(dir.path())
            .build(&ConsoleOutput)
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::BuildFailed(ref m) if m.contains("pom.xml")));
    }
}
