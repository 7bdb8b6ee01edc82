//! .NET (C#) module builder.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use super::{build_failed, ModuleProcessor};
use crate::error::{EdgeError, Result};
use crate::output::Output;
use crate::process::Cmd;

/// Builds C# modules with the `dotnet` CLI.
#[derive(Debug, Clone)]
pub struct DotNetProcessor {
    module_dir: PathBuf,
    configuration: String,
    exe_dir: String,
}

impl DotNetProcessor {
    pub fn new(module_dir: &Path, configuration: &str) -> Self {
        Self {
            module_dir: module_dir.to_path_buf(),
            configuration: configuration.to_string(),
            exe_dir: format!("bin/{}/publish", configuration),
        }
    }

    /// First `*.csproj` directly inside the module directory.
    fn find_project(&self) -> Result<PathBuf> {
        WalkDir::new(&self.module_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .find(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csproj"))
            .ok_or_else(|| {
                EdgeError::BuildFailed(format!(
                    "no .NET project file (*.csproj) found in {}",
                    self.module_dir.display()
                ))
            })
    }
}

#[async_trait]
impl ModuleProcessor for DotNetProcessor {
    fn name(&self) -> &str {
        "dotnet"
    }

    async fn build(&self, out: &dyn Output) -> Result<()> {
        let project = self.find_project()?;
        out.info(&format!("BUILDING DOTNET PROJECT: {}", project.display()), false);

        Cmd::new("dotnet")
            .arg("build")
            .arg_path(&project)
            .args(["-c", self.configuration.as_str()])
            .dir(&self.module_dir)
            .error_msg("dotnet build failed")
            .run()
            .await
            .map_err(|e| build_failed("dotnet build", e))?;
        Ok(())
    }

    async fn publish(&self, out: &dyn Output) -> Result<()> {
        let project = self.find_project()?;
        out.info(&format!("PUBLISHING DOTNET PROJECT TO: {}", self.exe_dir), false);

        Cmd::new("dotnet")
            .arg("publish")
            .arg_path(&project)
            .args(["-c", self.configuration.as_str(), "-o", self.exe_dir.as_str()])
            .dir(&self.module_dir)
            .error_msg("dotnet publish failed")
            .run()
            .await
            .map_err(|e| build_failed("dotnet publish", e))?;
        Ok(())
    }

    fn exe_dir(&self) -> &str {
        &self.exe_dir
    }
}
