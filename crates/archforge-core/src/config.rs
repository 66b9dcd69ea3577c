use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::format::{ArchiveFormat, UnknownFormat};
use crate::source::SourceConfig;

pub const CONFIG_FILE_NAME: &str = "archforge.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    UnsupportedFormat(#[from] UnknownFormat),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RawArchiveConfig {
    #[serde(default, rename = "type")]
    format: Option<String>,
    #[serde(default)]
    output_path: Option<PathBuf>,
    #[serde(flatten)]
    source: SourceConfig,
}

/// Parsed `archforge.yaml`. Relative paths are anchored at the directory
/// containing the file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub format: Option<ArchiveFormat>,
    pub output_path: Option<PathBuf>,
    pub source: SourceConfig,
}

pub fn load_config(path: &Path) -> Result<ArchiveConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_config(&contents, base_dir)
}

pub fn parse_config(contents: &str, base_dir: &Path) -> Result<ArchiveConfig, ConfigError> {
    let raw: RawArchiveConfig = serde_yaml::from_str(contents)?;
    let format = match raw.format {
        Some(value) => Some(value.parse::<ArchiveFormat>()?),
        None => None,
    };
    let anchor = |value: PathBuf| {
        if value.is_absolute() {
            value
        } else {
            base_dir.join(value)
        }
    };
    Ok(ArchiveConfig {
        format,
        output_path: raw.output_path.map(anchor),
        source: SourceConfig {
            source_content: raw.source.source_content,
            source_content_filename: raw.source.source_content_filename,
            source_file: raw.source.source_file.map(anchor),
            source_dir: raw.source.source_dir.map(anchor),
        },
    })
}

/// Looks for `archforge.yaml` in `start` and its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
