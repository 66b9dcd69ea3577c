use std::path::PathBuf;

use serde::Deserialize;

use crate::entry::validate_entry_name;
use crate::error::ArchiveError;

/// Where archive content comes from. Exactly one source per build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    InlineContent { bytes: Vec<u8>, entry_name: String },
    SingleFile { path: PathBuf },
    DirectoryTree { root: PathBuf },
}

impl SourceSpec {
    pub fn inline(bytes: impl Into<Vec<u8>>, entry_name: impl Into<String>) -> Self {
        SourceSpec::InlineContent {
            bytes: bytes.into(),
            entry_name: entry_name.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceSpec::SingleFile { path: path.into() }
    }

    pub fn directory(root: impl Into<PathBuf>) -> Self {
        SourceSpec::DirectoryTree { root: root.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::InlineContent { .. } => "source_content",
            SourceSpec::SingleFile { .. } => "source_file",
            SourceSpec::DirectoryTree { .. } => "source_dir",
        }
    }
}

/// Optional-field form of a source as it arrives from config files or flags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    #[serde(default)]
    pub source_content: Option<String>,
    #[serde(default)]
    pub source_content_filename: Option<String>,
    #[serde(default)]
    pub source_file: Option<PathBuf>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
}

impl SourceConfig {
    /// Overlays `other`; values set on `other` win. A source selected by
    /// `other` replaces the one selected here instead of adding to it, and
    /// the inline entry name only carries over from inline content to inline
    /// content.
    pub fn merged_with(self, other: SourceConfig) -> SourceConfig {
        let base = if other.selects_source() {
            let keep_name = self.source_content.is_some() && other.source_content.is_some();
            SourceConfig {
                source_content_filename: self.source_content_filename.filter(|_| keep_name),
                ..SourceConfig::default()
            }
        } else {
            self
        };
        SourceConfig {
            source_content: other.source_content.or(base.source_content),
            source_content_filename: other
                .source_content_filename
                .or(base.source_content_filename),
            source_file: other.source_file.or(base.source_file),
            source_dir: other.source_dir.or(base.source_dir),
        }
    }

    fn selects_source(&self) -> bool {
        self.source_content.is_some() || self.source_file.is_some() || self.source_dir.is_some()
    }

    pub fn into_spec(self) -> Result<SourceSpec, ArchiveError> {
        let mut selected = Vec::new();
        if self.source_content.is_some() {
            selected.push("source_content");
        }
        if self.source_file.is_some() {
            selected.push("source_file");
        }
        if self.source_dir.is_some() {
            selected.push("source_dir");
        }
        match selected.len() {
            0 => {
                return Err(ArchiveError::invalid_spec(
                    "one of source_content, source_file, or source_dir must be set",
                ))
            }
            1 => {}
            _ => {
                return Err(ArchiveError::invalid_spec(format!(
                    "only one source may be set, found {}",
                    selected.join(", ")
                )))
            }
        }

        if let Some(content) = self.source_content {
            let entry_name = self.source_content_filename.ok_or_else(|| {
                ArchiveError::invalid_spec(
                    "source_content_filename is required with source_content",
                )
            })?;
            validate_entry_name(&entry_name)?;
            return Ok(SourceSpec::inline(content.into_bytes(), entry_name));
        }
        if self.source_content_filename.is_some() {
            return Err(ArchiveError::invalid_spec(
                "source_content_filename is only valid with source_content",
            ));
        }
        if let Some(path) = self.source_file {
            return Ok(SourceSpec::SingleFile { path });
        }
        match self.source_dir {
            Some(root) => Ok(SourceSpec::DirectoryTree { root }),
            None => Err(ArchiveError::invalid_spec("no source selected")),
        }
    }
}
