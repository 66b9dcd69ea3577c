use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use archforge_core::config::{find_config, load_config, ArchiveConfig};
use archforge_core::{ArchiveFormat, ArtifactDescriptor, SourceConfig};
use archforge_pack::build_archive;
use tracing::{debug, info};

pub struct BuildArgs {
    pub format: Option<ArchiveFormat>,
    pub source: SourceConfig,
    pub output_path: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

pub struct BuildOutcome {
    pub descriptor: ArtifactDescriptor,
    /// `None` when no earlier state was recorded.
    pub changed: Option<bool>,
}

pub fn run(args: BuildArgs) -> anyhow::Result<BuildOutcome> {
    let file_config = match &args.config {
        Some(path) => {
            load_config(path).with_context(|| format!("load {}", path.display()))?
        }
        None => ArchiveConfig::default(),
    };

    let format = args.format.or(file_config.format).unwrap_or_default();
    let output_path = args
        .output_path
        .or(file_config.output_path)
        .ok_or_else(|| anyhow!("output_path is required (use --output-path or the config file)"))?;
    let spec = file_config.source.merged_with(args.source).into_spec()?;

    ensure_parent_dir(&output_path)?;
    let previous = match &args.state {
        Some(path) => read_state(path)?,
        None => None,
    };

    let descriptor = build_archive(&spec, format, &output_path)?;

    let changed = previous
        .as_ref()
        .map(|previous| !descriptor.is_unchanged_from(previous));
    if let Some(changed) = changed {
        info!(changed, "compared against recorded state");
    }
    if let Some(path) = &args.state {
        write_state(path, &descriptor)?;
    }
    Ok(BuildOutcome {
        descriptor,
        changed,
    })
}

/// An explicit `--config` wins; otherwise the nearest `archforge.yaml` in
/// `cwd` or one of its ancestors is used, if any.
pub fn discover_config(explicit: Option<PathBuf>, cwd: &Path) -> Option<PathBuf> {
    explicit.or_else(|| {
        let found = find_config(cwd)?;
        debug!(config = %found.display(), "using discovered config");
        Some(found)
    })
}

fn ensure_parent_dir(output_path: &Path) -> anyhow::Result<()> {
    if output_path.file_name().is_none() {
        bail!("output path '{}' has no file name", output_path.display());
    }
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            debug!(dir = %parent.display(), "creating output directory");
            fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn read_state(path: &Path) -> anyhow::Result<Option<ArtifactDescriptor>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read state {}", path.display()))?;
    let descriptor = ArtifactDescriptor::from_json(&contents)
        .with_context(|| format!("parse state {}", path.display()))?;
    Ok(Some(descriptor))
}

fn write_state(path: &Path, descriptor: &ArtifactDescriptor) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create state directory {}", parent.display()))?;
        }
    }
    let json = descriptor.to_json().context("serialize artifact descriptor")?;
    fs::write(path, json).with_context(|| format!("write state {}", path.display()))?;
    Ok(())
}
