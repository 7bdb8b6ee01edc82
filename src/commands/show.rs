//! Show command - displays information.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::module::{list_modules, ModuleDescriptor};
use crate::output::Output;
use crate::pipeline::PipelineSettings;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show the image tags the selected modules would produce
    Tags,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config, out: &dyn Output) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Tags => show_tags(config, out)?,
    }
    Ok(())
}

/// One line per (module, architecture) the current selection would build.
/// Unreadable descriptors are reported and skipped.
fn show_tags(config: &Config, out: &dyn Output) -> Result<()> {
    let settings = PipelineSettings::from_config(config);
    let all = list_modules(&config.modules_path)
        .with_context(|| format!("Cannot list modules in {}", config.modules_path.display()))?;

    for name in config.active_modules.select(all) {
        match ModuleDescriptor::load(&config.modules_path.join(&name)) {
            Ok(descriptor) => {
                for arch in config.active_platforms.select(descriptor.arch_keys()) {
                    let tag = settings.image_target(&name, &descriptor.tag_version, arch);
                    out.info(tag.as_str(), false);
                }
            }
            Err(e) => out.error(&format!("{}: {}", name, e)),
        }
    }
    Ok(())
}
