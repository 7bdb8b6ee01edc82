//! Registry client backed by the `docker` CLI.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;

use super::{BuiltImage, Credentials, ImageBuild, PushStream, RegistryClient};
use crate::error::RegistryError;
use crate::process::Cmd;

/// Drives `docker build`, `docker login` and `docker push`.
#[derive(Debug)]
pub struct DockerCli {
    program: String,
    logged_in: AtomicBool,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a different docker-compatible binary (e.g. `podman`).
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            logged_in: AtomicBool::new(false),
        }
    }

    fn build_command(&self, build: &ImageBuild) -> Cmd {
        let mut cmd = Cmd::new(&self.program)
            .args(["build", "--quiet", "-t", build.tag.as_str(), "-f"])
            .arg_path(&build.dockerfile);
        for (key, value) in &build.build_args {
            cmd = cmd.arg("--build-arg").arg(format!("{}={}", key, value));
        }
        cmd.args(&build.options).arg_path(&build.context)
    }

    /// Log in once per client. Anonymous pushes skip this.
    async fn login(&self, credentials: &Credentials, tag: &str) -> Result<(), RegistryError> {
        if !credentials.is_complete() || self.logged_in.load(Ordering::SeqCst) {
            return Ok(());
        }

        Cmd::new(&self.program)
            .args([
                "login",
                credentials.server.as_str(),
                "-u",
                credentials.username.as_str(),
                "--password-stdin",
            ])
            .stdin(credentials.password.as_str())
            .error_msg(format!("docker login to {} failed", credentials.server))
            .run()
            .await
            .map_err(|e| RegistryError::ImagePushFailed {
                tag: tag.to_string(),
                reason: format!("{:#}", e),
            })?;

        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for DockerCli {
    async fn build_image(&self, build: &ImageBuild) -> Result<BuiltImage, RegistryError> {
        let result = self
            .build_command(build)
            .error_msg("docker build failed")
            .run()
            .await
            .map_err(|e| RegistryError::ImageBuildFailed {
                tag: build.tag.clone(),
                reason: format!("{:#}", e),
            })?;

        let id = result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(String::from);

        Ok(BuiltImage {
            tag: build.tag.clone(),
            id,
        })
    }

    async fn push_image(
        &self,
        tag: &str,
        credentials: &Credentials,
    ) -> Result<PushStream, RegistryError> {
        self.login(credentials, tag).await?;

        let owned_tag = tag.to_string();
        let lines = Cmd::new(&self.program)
            .args(["push", tag])
            .error_msg("docker push failed")
            .spawn_lines()
            .await
            .map_err(|e| RegistryError::ImagePushFailed {
                tag: owned_tag.clone(),
                reason: format!("{:#}", e),
            })?;

        Ok(lines
            .map(move |line| {
                line.map_err(|e| RegistryError::ImagePushFailed {
                    tag: owned_tag.clone(),
                    reason: format!("{:#}", e),
                })
            })
            .boxed())
    }
}
