use std::fs;
use std::path::{Path, PathBuf};

use archforge_core::entry::path_to_archive_name;
use archforge_core::ArchiveError;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkedFile {
    pub relative_name: String,
    pub path: PathBuf,
}

/// Depth-first walk over the files under a root. Siblings are visited in
/// file-name order, so output never depends on the host's listing order.
/// Directories are descended but never yielded; symlinks are yielded as
/// leaves without being followed.
pub struct DirectoryWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
    excluded: Vec<PathBuf>,
    failed: bool,
}

pub fn walk(root: &Path) -> DirectoryWalker {
    DirectoryWalker {
        root: root.to_path_buf(),
        inner: WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter(),
        excluded: Vec::new(),
        failed: false,
    }
}

impl DirectoryWalker {
    /// Never yields `path`, however it is spelled. The path need not exist
    /// yet, but its parent directory must.
    pub fn exclude(&mut self, path: &Path) {
        if let Some(location) = location_of(path) {
            self.excluded.push(location);
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        !self.excluded.is_empty()
            && location_of(path).is_some_and(|location| self.excluded.contains(&location))
    }
}

// Only the parent is canonicalized, so a symlink leaf is compared by where
// it sits rather than by what it points to.
fn location_of(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|dir| dir.join(name))
}

impl Iterator for DirectoryWalker {
    type Item = Result<WalkedFile, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    self.failed = true;
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(ArchiveError::unreadable(&path, err)));
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if self.is_excluded(entry.path()) {
                debug!(path = %entry.path().display(), "skipping excluded file");
                continue;
            }
            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(ArchiveError::unreadable(entry.path(), err)));
                }
            };
            let relative_name = path_to_archive_name(relative);
            if relative_name.is_empty() {
                // The root itself is not a directory.
                self.failed = true;
                return Some(Err(ArchiveError::unreadable(
                    &self.root,
                    "source directory is not a directory",
                )));
            }
            return Some(Ok(WalkedFile {
                relative_name,
                path: entry.into_path(),
            }));
        }
    }
}
