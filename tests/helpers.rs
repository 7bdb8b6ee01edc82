//! Shared test utilities for edgebuild tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use edgebuild::config::Config;
use edgebuild::output::Output;
use edgebuild::registry::{BuiltImage, Credentials, ImageBuild, PushStream, RegistryClient};
use edgebuild::RegistryError;

/// Test environment with a temporary modules directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Project root simulation
    pub base_dir: PathBuf,
    /// `<base_dir>/modules`
    pub modules: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        let modules = base_dir.join("modules");
        fs::create_dir_all(&modules).expect("Failed to create modules dir");

        Self {
            _temp_dir: temp_dir,
            base_dir,
            modules,
        }
    }

    /// Config pointing at this environment plus `vars`.
    pub fn config(&self, vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(&self.base_dir, &vars)
    }

    /// Create a module with a descriptor and one Dockerfile per platform.
    pub fn add_module(&self, name: &str, language: &str, version: &str, platforms: &[(&str, &str)]) -> PathBuf {
        let dir = self.modules.join(name);
        fs::create_dir_all(&dir).expect("Failed to create module dir");

        let platform_json: Vec<String> = platforms
            .iter()
            .map(|(arch, file)| format!("\"{}\": \"{}\"", arch, file))
            .collect();
        let descriptor = format!(
            r#"{{
  "$schema-version": "0.0.1",
  "description": "",
  "image": {{
    "repository": "localhost:5000/{}",
    "tag": {{ "version": "{}", "platforms": {{ {} }} }},
    "buildOptions": []
  }},
  "language": "{}"
}}"#,
            name.to_lowercase(),
            version,
            platform_json.join(", "),
            language
        );
        fs::write(dir.join("module.json"), descriptor).expect("Failed to write module.json");

        for (_, file) in platforms {
            fs::write(dir.join(file), "FROM scratch\nARG EXE_DIR=.\n").expect("Failed to write Dockerfile");
        }
        dir
    }
}

/// One recorded sink event. Suppressed events are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Header(String),
    Info(String),
    Error(String),
    Footer(String),
    Procout(String),
}

/// Output sink that remembers what it was told.
#[derive(Default)]
pub struct RecordingOutput {
    events: Mutex<Vec<Event>>,
}

impl RecordingOutput {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn procout(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Procout(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn contains_info(&self, needle: &str) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, Event::Info(s) if s.contains(needle)))
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Output for RecordingOutput {
    fn header(&self, text: &str, suppress: bool) {
        if !suppress {
            self.push(Event::Header(text.to_string()));
        }
    }

    fn info(&self, text: &str, suppress: bool) {
        if !suppress {
            self.push(Event::Info(text.to_string()));
        }
    }

    fn error(&self, text: &str) {
        self.push(Event::Error(text.to_string()));
    }

    fn footer(&self, text: &str, suppress: bool) {
        if !suppress {
            self.push(Event::Footer(text.to_string()));
        }
    }

    fn procout(&self, line: &str) {
        self.push(Event::Procout(line.to_string()));
    }
}

/// Registry client that records calls instead of running docker.
#[derive(Default)]
pub struct FakeRegistry {
    pub builds: Mutex<Vec<ImageBuild>>,
    pub pushes: Mutex<Vec<String>>,
    /// Tags whose image build fails.
    pub fail_builds: HashSet<String>,
    /// Tags whose push fails after the progress lines.
    pub fail_pushes: HashSet<String>,
    /// Progress lines emitted for every push.
    pub push_lines: Vec<String>,
    /// Cancel the token once the image with this tag has been built.
    pub cancel_after_build: Option<(String, CancellationToken)>,
    /// Cancel the token when this tag starts pushing, then never finish the push.
    pub stall_push: Option<(String, CancellationToken)>,
}

impl FakeRegistry {
    pub fn built_tags(&self) -> Vec<String> {
        self.builds.lock().unwrap().iter().map(|b| b.tag.clone()).collect()
    }

    pub fn pushed_tags(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }

    /// Contexts of recorded builds, for checking module isolation.
    pub fn build_contexts(&self) -> Vec<PathBuf> {
        self.builds.lock().unwrap().iter().map(|b| b.context.clone()).collect()
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn build_image(&self, build: &ImageBuild) -> Result<BuiltImage, RegistryError> {
        self.builds.lock().unwrap().push(build.clone());
        if self.fail_builds.contains(&build.tag) {
            return Err(RegistryError::ImageBuildFailed {
                tag: build.tag.clone(),
                reason: "simulated build failure".into(),
            });
        }
        if let Some((tag, token)) = &self.cancel_after_build {
            if *tag == build.tag {
                token.cancel();
            }
        }
        Ok(BuiltImage {
            tag: build.tag.clone(),
            id: Some(format!("sha256:{}", build.tag.len())),
        })
    }

    async fn push_image(&self, tag: &str, _credentials: &Credentials) -> Result<PushStream, RegistryError> {
        self.pushes.lock().unwrap().push(tag.to_string());

        let mut items: Vec<Result<String, RegistryError>> =
            self.push_lines.iter().cloned().map(Ok).collect();
        if self.fail_pushes.contains(tag) {
            items.push(Err(RegistryError::ImagePushFailed {
                tag: tag.to_string(),
                reason: "simulated push failure".into(),
            }));
        }
        if let Some((stalled, token)) = &self.stall_push {
            if stalled == tag {
                token.cancel();
                return Ok(stream::iter(items).chain(stream::pending()).boxed());
            }
        }
        Ok(stream::iter(items).boxed())
    }
}

pub fn module_dir(env: &TestEnv, name: &str) -> PathBuf {
    env.modules.join(name)
}

/// Write an executable shell script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create script dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod script");
    path
}

/// Puts a directory first on PATH until dropped. Use from `#[serial]` tests only.
pub struct PathPrepend {
    original: Option<OsString>,
}

impl PathPrepend {
    pub fn new(dir: &Path) -> Self {
        let original = std::env::var_os("PATH");
        let mut paths = vec![dir.to_path_buf()];
        if let Some(ref existing) = original {
            paths.extend(std::env::split_paths(existing));
        }
        let joined = std::env::join_paths(paths).expect("Failed to join PATH");
        std::env::set_var("PATH", joined);
        Self { original }
    }
}

impl Drop for PathPrepend {
    fn drop(&mut self) {
        match self.original.take() {
            Some(path) => std::env::set_var("PATH", path),
            None => std::env::remove_var("PATH"),
        }
    }
}
