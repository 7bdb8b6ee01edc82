//! Configuration management for edgebuild.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::module::Selection;

/// Default registry when none is configured (a local registry container).
pub const DEFAULT_REGISTRY_SERVER: &str = "localhost:5000";

/// Default directory holding one subdirectory per module.
pub const DEFAULT_MODULES_PATH: &str = "modules";

/// Default build configuration passed to managed-runtime builders.
pub const DEFAULT_BUILD_CONFIGURATION: &str = "Release";

/// Edgebuild configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry host (and optional port) images are tagged for.
    pub registry_server: String,
    /// Registry username (empty if unset).
    pub registry_username: String,
    /// Registry password (empty if unset).
    pub registry_password: String,
    /// Directory containing module directories.
    pub modules_path: PathBuf,
    /// Which modules to process.
    pub active_modules: Selection,
    /// Which architectures to process.
    pub active_platforms: Selection,
    /// Optional tag suffix (e.g. "dev"), empty for none.
    pub container_tag: String,
    /// Build configuration for dotnet modules (e.g. "Release").
    pub build_configuration: String,
}

impl Config {
    /// Load configuration from .env file and environment.
    ///
    /// Searches for .env in:
    /// 1. Current directory
    /// 2. The base directory
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let candidates = [PathBuf::from(".env"), base_dir.join(".env")];
        if let Some(env_path) = candidates.iter().find(|p| p.is_file()) {
            match dotenvy::from_path_iter(env_path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                env_vars.insert(key, value);
                            }
                            Err(e) => {
                                eprintln!("[WARN] Skipping bad line in {}: {}", env_path.display(), e)
                            }
                        }
                    }
                }
                Err(e) => eprintln!("[WARN] Cannot read {}: {}", env_path.display(), e),
            }
        }

        // Environment variables override .env file
        env_vars.extend(std::env::vars());

        Self::from_vars(base_dir, &env_vars)
    }

    /// Build a config from an already-merged variable map.
    pub fn from_vars(base_dir: &Path, vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string());

        let registry_server = get("CONTAINER_REGISTRY_SERVER")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY_SERVER.to_string());

        let modules_path = get("MODULES_PATH")
            .filter(|s| !s.is_empty())
            .map(|s| {
                let path = PathBuf::from(s);
                if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                }
            })
            .unwrap_or_else(|| base_dir.join(DEFAULT_MODULES_PATH));

        Self {
            registry_server,
            registry_username: get("CONTAINER_REGISTRY_USERNAME").unwrap_or_default(),
            registry_password: get("CONTAINER_REGISTRY_PASSWORD").unwrap_or_default(),
            modules_path,
            active_modules: Selection::parse(&get("ACTIVE_MODULES").unwrap_or_default()),
            active_platforms: Selection::parse(
                &get("ACTIVE_DOCKER_PLATFORMS").unwrap_or_default(),
            ),
            container_tag: get("CONTAINER_TAG").unwrap_or_default(),
            build_configuration: get("BUILD_CONFIGURATION")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_BUILD_CONFIGURATION.to_string()),
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  CONTAINER_REGISTRY_SERVER: {}", self.registry_server);
        println!("  CONTAINER_REGISTRY_USERNAME: {}", self.registry_username);
        let password = if self.registry_password.is_empty() {
            "(not set)"
        } else {
            "********"
        };
        println!("  CONTAINER_REGISTRY_PASSWORD: {}", password);
        println!("  MODULES_PATH: {}", self.modules_path.display());
        println!("  ACTIVE_MODULES: {}", self.active_modules);
        println!("  ACTIVE_DOCKER_PLATFORMS: {}", self.active_platforms);
        println!("  CONTAINER_TAG: {}", self.container_tag);
        println!("  BUILD_CONFIGURATION: {}", self.build_configuration);
        if self.modules_path.is_dir() {
            println!("  Modules directory: FOUND");
        } else {
            println!("  Modules directory: NOT FOUND");
        }
    }
}
