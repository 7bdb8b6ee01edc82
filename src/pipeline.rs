//! Build/publish pipeline.
//!
//! Walks the selected modules in listing order and, for each, runs the
//! language builder and then builds and pushes one image per selected
//! architecture:
//!
//! ```text
//! list modules → select → per module:
//!     load module.json → resolve builder → build()
//!     per selected architecture:
//!         tag → publish() (first only) → build image → push image
//! ```
//!
//! Failures are isolated. A descriptor, language or builder failure skips
//! the rest of that module; an image build or push failure skips the rest of
//! that architecture. The run itself always completes (or is cancelled) and
//! returns a [`RunReport`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::builder::{ModuleProcessor, Processor};
use crate::config::Config;
use crate::error::{EdgeError, RegistryError, Result};
use crate::module::{list_modules, ImageTarget, ModuleDescriptor, Selection};
use crate::output::Output;
use crate::registry::{normalize_progress, Credentials, ImageBuild, RegistryClient};
use crate::timing::Timer;

/// Build argument carrying the builder's artifact directory.
pub const EXE_DIR_ARG: &str = "EXE_DIR";

/// Which phases a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Build images, don't push.
    Build,
    /// Build and push.
    BuildAndPush,
    /// Push images built by an earlier run. No builder or image build steps.
    PushOnly,
}

impl Mode {
    pub fn builds(self) -> bool {
        !matches!(self, Self::PushOnly)
    }

    pub fn pushes(self) -> bool {
        !matches!(self, Self::Build)
    }
}

/// Inputs the pipeline reads from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub modules_path: PathBuf,
    pub active_modules: Selection,
    pub active_platforms: Selection,
    pub container_tag: String,
    pub build_configuration: String,
    pub credentials: Credentials,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            modules_path: config.modules_path.clone(),
            active_modules: config.active_modules.clone(),
            active_platforms: config.active_platforms.clone(),
            container_tag: config.container_tag.clone(),
            build_configuration: config.build_configuration.clone(),
            credentials: Credentials::new(
                &config.registry_server,
                &config.registry_username,
                &config.registry_password,
            ),
        }
    }

    /// Tag for one (module, architecture) pair under these settings.
    pub fn image_target(&self, module: &str, tag_version: &str, arch: &str) -> ImageTarget {
        ImageTarget::new(
            &self.credentials.server,
            module,
            tag_version,
            &self.container_tag,
            arch,
        )
    }
}

/// How one module ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Module-level steps finished. Individual architectures may still have failed.
    Succeeded,
    Failed {
        reason: String,
        /// Failure came from a missing or malformed descriptor.
        descriptor_error: bool,
    },
    /// Not (fully) processed because the run was cancelled.
    Cancelled,
}

/// Result of one architecture of one module.
#[derive(Debug, Clone)]
pub struct ArchOutcome {
    pub arch: String,
    pub tag: ImageTarget,
    /// `Err` holds the reported reason.
    pub result: std::result::Result<(), String>,
}

#[derive(Debug, Clone)]
pub struct ModuleOutcome {
    pub name: String,
    pub status: ModuleStatus,
    pub archs: Vec<ArchOutcome>,
}

/// Everything that happened in one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub modules: Vec<ModuleOutcome>,
    /// The module directory listing itself failed.
    pub listing_error: Option<String>,
}

impl RunReport {
    /// True if any module failed because of its descriptor.
    pub fn has_descriptor_failures(&self) -> bool {
        self.modules.iter().any(|m| {
            matches!(
                m.status,
                ModuleStatus::Failed {
                    descriptor_error: true,
                    ..
                }
            )
        })
    }

    pub fn failed_modules(&self) -> impl Iterator<Item = &ModuleOutcome> {
        self.modules
            .iter()
            .filter(|m| matches!(m.status, ModuleStatus::Failed { .. }))
    }

    pub fn failed_archs(&self) -> impl Iterator<Item = (&ModuleOutcome, &ArchOutcome)> {
        self.modules
            .iter()
            .flat_map(|m| m.archs.iter().map(move |a| (m, a)))
            .filter(|(_, a)| a.result.is_err())
    }

    /// Every tag the run attempted, in processing order.
    pub fn tags(&self) -> Vec<&str> {
        self.modules
            .iter()
            .flat_map(|m| m.archs.iter().map(|a| a.tag.as_str()))
            .collect()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleOutcome> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Print a short end-of-run summary.
    pub fn print_summary(&self, out: &dyn Output) {
        let total_archs: usize = self.modules.iter().map(|m| m.archs.len()).sum();
        let failed_archs = self.failed_archs().count();
        let failed_modules = self.failed_modules().count();
        let cancelled = self
            .modules
            .iter()
            .filter(|m| m.status == ModuleStatus::Cancelled)
            .count();

        out.info(
            &format!(
                "Summary: {} module(s), {}/{} image(s) ok",
                self.modules.len(),
                total_archs - failed_archs,
                total_archs
            ),
            false,
        );
        for m in self.failed_modules() {
            if let ModuleStatus::Failed { reason, .. } = &m.status {
                out.info(&format!("  [FAIL] {}: {}", m.name, reason), false);
            }
        }
        for (m, a) in self.failed_archs() {
            if let Err(reason) = &a.result {
                out.info(&format!("  [FAIL] {} ({}): {}", m.name, a.arch, reason), false);
            }
        }
        if failed_modules == 0 && failed_archs == 0 && cancelled == 0 {
            out.info("  All modules processed.", false);
        }
        if cancelled > 0 {
            out.info(&format!("  {} module(s) cancelled", cancelled), false);
        }
    }
}

/// Reports missing registry credentials once, then quietly skips pushes.
#[derive(Default)]
struct PushGate {
    reported: bool,
}

impl PushGate {
    fn allow(&mut self, credentials: &Credentials, tag: &ImageTarget, out: &dyn Output) -> Result<()> {
        if !credentials.required() || credentials.is_complete() {
            return Ok(());
        }
        if self.reported {
            out.info(
                &format!("[SKIP] Push of {}: missing registry credentials", tag),
                false,
            );
        } else {
            out.error(&format!(
                "Registry {} needs CONTAINER_REGISTRY_USERNAME and CONTAINER_REGISTRY_PASSWORD; \
                 image pushes are skipped for this run",
                credentials.server
            ));
            self.reported = true;
        }
        Err(RegistryError::MissingCredentials {
            server: credentials.server.clone(),
        }
        .into())
    }
}

/// Whether a module ran to the end or stopped for cancellation.
enum ModuleFlow {
    Completed,
    Cancelled,
}

/// Per-architecture inputs shared by every architecture of a module.
struct ModuleContext<'m> {
    name: &'m str,
    dir: &'m Path,
    descriptor: &'m ModuleDescriptor,
    processor: &'m Processor,
}

/// The orchestrator.
pub struct Pipeline<'a> {
    settings: PipelineSettings,
    registry: &'a dyn RegistryClient,
    out: &'a dyn Output,
    cancel: CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: PipelineSettings,
        registry: &'a dyn RegistryClient,
        out: &'a dyn Output,
    ) -> Self {
        Self {
            settings,
            registry,
            out,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next architecture boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the pipeline over every selected module.
    pub async fn run(&self, mode: Mode) -> RunReport {
        let no_build = !mode.builds();
        let no_push = !mode.pushes();
        let mut report = RunReport::default();

        self.out.header("BUILDING MODULES", no_build);
        let timer = Timer::start("All modules");

        let all = match list_modules(&self.settings.modules_path) {
            Ok(all) => all,
            Err(e) => {
                let reason = format!(
                    "Cannot list modules in {}: {}",
                    self.settings.modules_path.display(),
                    e
                );
                self.out.error(&reason);
                report.listing_error = Some(reason);
                return report;
            }
        };

        let selected = self.settings.active_modules.select(all);
        if selected.is_empty() {
            self.out.info("[SKIP] No modules selected", false);
        }

        let mut gate = PushGate::default();
        let mut cancelled = false;
        for name in selected {
            if cancelled || self.cancel.is_cancelled() {
                cancelled = true;
                report.modules.push(ModuleOutcome {
                    name,
                    status: ModuleStatus::Cancelled,
                    archs: Vec::new(),
                });
                continue;
            }

            let outcome = self.process_module(&name, mode, &mut gate).await;
            cancelled = outcome.status == ModuleStatus::Cancelled;
            report.modules.push(outcome);
        }

        if cancelled {
            self.out.error("Run cancelled; remaining modules were not processed");
        }

        timer.finish(self.out, no_build);
        self.out.footer("BUILD COMPLETE", no_build);
        self.out.footer("PUSH COMPLETE", no_push);
        report
    }

    async fn process_module(&self, name: &str, mode: Mode, gate: &mut PushGate) -> ModuleOutcome {
        let dir = self.settings.modules_path.join(name);
        self.out
            .info(&format!("BUILDING MODULE: {}", dir.display()), !mode.builds());

        let timer = Timer::start(name);
        let mut archs = Vec::new();
        let status = match self.run_module(name, &dir, mode, gate, &mut archs).await {
            Ok(ModuleFlow::Completed) => ModuleStatus::Succeeded,
            Ok(ModuleFlow::Cancelled) => ModuleStatus::Cancelled,
            Err(e) => {
                self.out.error(&format!("Module {} skipped: {}", name, e));
                ModuleStatus::Failed {
                    reason: e.to_string(),
                    descriptor_error: e.is_descriptor_error(),
                }
            }
        };
        timer.finish(self.out, !mode.builds());

        ModuleOutcome {
            name: name.to_string(),
            status,
            archs,
        }
    }

    /// Module-scoped steps. An `Err` abandons the module.
    async fn run_module(
        &self,
        name: &str,
        dir: &Path,
        mode: Mode,
        gate: &mut PushGate,
        archs: &mut Vec<ArchOutcome>,
    ) -> Result<ModuleFlow> {
        let descriptor = ModuleDescriptor::load(dir)?;
        let processor =
            Processor::for_language(&descriptor.language, dir, &self.settings.build_configuration)?;

        if mode.builds() {
            processor.build(self.out).await?;
        }

        let module = ModuleContext {
            name,
            dir,
            descriptor: &descriptor,
            processor: &processor,
        };

        let mut published = false;
        for arch in self.settings.active_platforms.select(descriptor.arch_keys()) {
            if self.cancel.is_cancelled() {
                return Ok(ModuleFlow::Cancelled);
            }
            let Some(dockerfile) = descriptor.dockerfile_for(arch) else {
                continue;
            };

            self.out.info(
                &format!("PROCESSING DOCKER FILE: {}", dockerfile),
                !mode.builds(),
            );
            let tag = self
                .settings
                .image_target(name, &descriptor.tag_version, arch);

            if mode.builds() && !published {
                self.out
                    .info(&format!("PUBLISHING MODULE: {}", dir.display()), false);
                processor.publish(self.out).await?;
                published = true;
            }

            let result = self.process_arch(&module, dockerfile, &tag, mode, gate).await;
            if let Err(e) = &result {
                // The gate has already reported missing credentials
                if !matches!(e, EdgeError::Registry(RegistryError::MissingCredentials { .. })) {
                    self.out
                        .error(&format!("Image {} for {} ({}): {}", tag, name, arch, e));
                }
            }
            archs.push(ArchOutcome {
                arch: arch.to_string(),
                tag,
                result: result.map_err(|e| e.to_string()),
            });
        }

        Ok(ModuleFlow::Completed)
    }

    /// Architecture-scoped steps. An `Err` skips the rest of this architecture.
    async fn process_arch(
        &self,
        module: &ModuleContext<'_>,
        dockerfile: &str,
        tag: &ImageTarget,
        mode: Mode,
        gate: &mut PushGate,
    ) -> Result<()> {
        self.out
            .info(&format!("BUILDING DOCKER IMAGE: {}", tag), !mode.builds());

        if mode.builds() {
            let dockerfile_path = module.dir.join(dockerfile);
            if !dockerfile_path.is_file() {
                return Err(RegistryError::ImageBuildFailed {
                    tag: tag.to_string(),
                    reason: format!("dockerfile {} not found", dockerfile_path.display()),
                }
                .into());
            }

            let build = ImageBuild {
                tag: tag.to_string(),
                context: module.dir.to_path_buf(),
                dockerfile: dockerfile_path,
                build_args: BTreeMap::from([(
                    EXE_DIR_ARG.to_string(),
                    module.processor.exe_dir().to_string(),
                )]),
                options: module.descriptor.build_options.clone(),
            };
            let built = self.registry.build_image(&build).await?;
            let details = match &built.id {
                Some(id) => format!("DOCKER IMAGE DETAILS: {} ({})", built.tag, id),
                None => format!("DOCKER IMAGE DETAILS: {}", built.tag),
            };
            self.out.info(&details, false);
        }

        if mode.pushes() {
            gate.allow(&self.settings.credentials, tag, self.out)?;
            self.out
                .info(&format!("PUSHING DOCKER IMAGE TO: {}", tag), false);

            let mut progress = self
                .registry
                .push_image(tag.as_str(), &self.settings.credentials)
                .await?;
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        return Err(RegistryError::ImagePushFailed {
                            tag: tag.to_string(),
                            reason: "cancelled".into(),
                        }
                        .into());
                    }
                    line = progress.next() => match line {
                        Some(Ok(line)) => self.out.procout(&normalize_progress(&line)),
                        Some(Err(e)) => return Err(e.into()),
                        None => break,
                    },
                }
            }
        }

        tracing::debug!(module = module.name, %tag, "architecture done");
        Ok(())
    }
}
