//! Container registry client interface.
//!
//! The pipeline only talks to the registry through [`RegistryClient`], so a
//! different backend (or a recording fake in tests) can be swapped in.

mod docker;

pub use docker::DockerCli;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::RegistryError;

/// Registry login details.
#[derive(Clone, Default)]
pub struct Credentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        Self {
            server: server.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Both username and password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Local registries accept anonymous pushes; everything else needs a login.
    pub fn required(&self) -> bool {
        !is_local_registry(&self.server)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// `localhost` or `127.0.0.1`, with or without a port.
pub fn is_local_registry(server: &str) -> bool {
    let host = server.split(':').next().unwrap_or_default();
    matches!(host.to_ascii_lowercase().as_str(), "localhost" | "127.0.0.1")
}

/// Everything needed to build one image.
#[derive(Debug, Clone)]
pub struct ImageBuild {
    pub tag: String,
    /// Build context root. Never the process working directory.
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub build_args: BTreeMap<String, String>,
    /// Extra options from the module descriptor.
    pub options: Vec<String>,
}

/// A successfully built image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub tag: String,
    pub id: Option<String>,
}

/// Push progress lines in arrival order. Finite and not restartable.
pub type PushStream = BoxStream<'static, Result<String, RegistryError>>;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Build an image. Returns once the build has finished.
    async fn build_image(&self, build: &ImageBuild) -> Result<BuiltImage, RegistryError>;

    /// Start pushing `tag`. Progress is read from the returned stream; a
    /// failure part-way through arrives as an `Err` item.
    async fn push_image(
        &self,
        tag: &str,
        credentials: &Credentials,
    ) -> Result<PushStream, RegistryError>;
}

/// Undo the JSON escaping of `>` that shows up in registry progress output.
pub fn normalize_progress(line: &str) -> String {
    line.replace("\\u003e", ">")
}
