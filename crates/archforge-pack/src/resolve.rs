use std::fs;
use std::path::Path;

use archforge_core::entry::{validate_entry_name, DEFAULT_FILE_MODE, EXECUTABLE_FILE_MODE};
use archforge_core::{ArchiveEntry, ArchiveError, SourceSpec};

use crate::walk::{walk, DirectoryWalker, WalkedFile};

/// Entries for one source, in the order they must be written.
pub struct ResolvedEntries {
    inner: Inner,
}

enum Inner {
    Single(Option<ArchiveEntry>),
    Tree(DirectoryWalker),
}

impl ResolvedEntries {
    /// Keeps `path` out of a directory source. Single-entry sources ignore it.
    pub fn exclude(&mut self, path: &Path) {
        if let Inner::Tree(walker) = &mut self.inner {
            walker.exclude(path);
        }
    }
}

impl Iterator for ResolvedEntries {
    type Item = Result<ArchiveEntry, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Single(entry) => entry.take().map(Ok),
            Inner::Tree(walker) => walker.next().map(|item| item.and_then(walked_entry)),
        }
    }
}

/// Checks that can fail without reading content happen here, before the
/// caller creates any output.
pub fn resolve(spec: &SourceSpec) -> Result<ResolvedEntries, ArchiveError> {
    let inner = match spec {
        SourceSpec::InlineContent { bytes, entry_name } => {
            validate_entry_name(entry_name)?;
            Inner::Single(Some(ArchiveEntry::from_bytes(entry_name, bytes.clone())?))
        }
        SourceSpec::SingleFile { path } => {
            let mode = regular_file_mode(path)?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| ArchiveError::unreadable(path, "path has no file name"))?;
            Inner::Single(Some(ArchiveEntry::from_file(&name, path.clone(), mode)?))
        }
        SourceSpec::DirectoryTree { root } => {
            let metadata = fs::metadata(root).map_err(|err| ArchiveError::unreadable(root, err))?;
            if !metadata.is_dir() {
                return Err(ArchiveError::unreadable(root, "not a directory"));
            }
            Inner::Tree(walk(root))
        }
    };
    Ok(ResolvedEntries { inner })
}

fn walked_entry(file: WalkedFile) -> Result<ArchiveEntry, ArchiveError> {
    let mode = regular_file_mode(&file.path)?;
    ArchiveEntry::from_file(&file.relative_name, file.path, mode)
}

// Follows symlinks: a link to a regular file is archived with the target's
// content, anything else is unreadable.
fn regular_file_mode(path: &Path) -> Result<u32, ArchiveError> {
    let metadata = fs::metadata(path).map_err(|err| ArchiveError::unreadable(path, err))?;
    if !metadata.is_file() {
        return Err(ArchiveError::unreadable(path, "not a regular file"));
    }
    Ok(normalized_mode(&metadata))
}

#[cfg(unix)]
fn normalized_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    if metadata.permissions().mode() & 0o111 != 0 {
        EXECUTABLE_FILE_MODE
    } else {
        DEFAULT_FILE_MODE
    }
}

#[cfg(not(unix))]
fn normalized_mode(_metadata: &fs::Metadata) -> u32 {
    DEFAULT_FILE_MODE
}
