use std::path::{Component, Path, PathBuf};

use crate::error::ArchiveError;

pub const DEFAULT_FILE_MODE: u32 = 0o644;
pub const EXECUTABLE_FILE_MODE: u32 = 0o755;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: EntryContent,
    pub mode: u32,
    pub is_directory: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryContent {
    Bytes(Vec<u8>),
    /// Read when the writer reaches the entry.
    File(PathBuf),
}

impl ArchiveEntry {
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        validate_entry_name(name)?;
        Ok(Self {
            name: name.to_string(),
            content: EntryContent::Bytes(bytes),
            mode: DEFAULT_FILE_MODE,
            is_directory: false,
        })
    }

    pub fn from_file(name: &str, path: PathBuf, mode: u32) -> Result<Self, ArchiveError> {
        validate_entry_name(name)?;
        Ok(Self {
            name: name.to_string(),
            content: EntryContent::File(path),
            mode,
            is_directory: false,
        })
    }
}

/// Archive-relative names are `/`-separated, relative, and never climb out
/// of the archive root.
pub fn validate_entry_name(name: &str) -> Result<(), ArchiveError> {
    let reject = |reason: &'static str| ArchiveError::InvalidEntryName {
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(reject("name is empty"));
    }
    if name.starts_with('/') || name.starts_with('\\') || has_drive_prefix(name) {
        return Err(reject("name is absolute"));
    }
    for segment in name.split(['/', '\\']) {
        if segment == ".." {
            return Err(reject("contains a '..' segment"));
        }
    }
    Ok(())
}

pub fn path_to_archive_name(relative: &Path) -> String {
    let mut components = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            components.push(part.to_string_lossy().into_owned());
        }
    }
    components.join("/")
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
