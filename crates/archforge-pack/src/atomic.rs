use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use archforge_core::ArchiveError;
use tempfile::{NamedTempFile, PersistError};
use tracing::{debug, warn};

const RENAME_ATTEMPTS: u32 = 3;
const RENAME_BACKOFF: Duration = Duration::from_millis(25);

/// Fills a sibling temporary file via `fill`, then renames it over
/// `destination`. `fill` also receives the temporary file's path. Nothing
/// appears at `destination` unless every step succeeds; on failure the
/// temporary file is removed.
pub fn write_atomic<T, F>(destination: &Path, fill: F) -> Result<T, ArchiveError>
where
    F: FnOnce(&mut File, &Path) -> Result<T, ArchiveError>,
{
    let file_name = destination
        .file_name()
        .ok_or_else(|| ArchiveError::write_failed(destination, "output path has no file name"))?;
    let parent = destination_dir(destination);
    if !parent.is_dir() {
        return Err(ArchiveError::write_failed(
            destination,
            format!("directory '{}' does not exist", parent.display()),
        ));
    }

    let prefix = format!(".{}.", file_name.to_string_lossy());
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(&parent)
        .map_err(|err| ArchiveError::write_failed(destination, err))?;
    let temp_path = temp.path().to_path_buf();
    debug!(temp = %temp_path.display(), "writing temporary archive");

    let filled = fill(temp.as_file_mut(), &temp_path).and_then(|value| {
        temp.as_file_mut()
            .sync_all()
            .map_err(|err| ArchiveError::write_failed(destination, err))?;
        Ok(value)
    });
    let value = match filled {
        Ok(value) => value,
        Err(err) => {
            discard(temp);
            return Err(err);
        }
    };
    persist_with_retry(temp, destination)?;
    Ok(value)
}

pub fn destination_dir(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn persist_with_retry(mut temp: NamedTempFile, destination: &Path) -> Result<(), ArchiveError> {
    let mut attempt = 1;
    loop {
        match temp.persist(destination) {
            Ok(_) => return Ok(()),
            Err(PersistError { error, file }) => {
                if attempt >= RENAME_ATTEMPTS {
                    discard(file);
                    return Err(ArchiveError::write_failed(
                        destination,
                        format!("rename failed after {} attempts: {}", attempt, error),
                    ));
                }
                warn!(
                    destination = %destination.display(),
                    attempt,
                    error = %error,
                    "rename into place failed, retrying"
                );
                temp = file;
                thread::sleep(RENAME_BACKOFF * attempt);
                attempt += 1;
            }
        }
    }
}

// Cleanup failures are logged so they never mask the error that caused them.
fn discard(temp: NamedTempFile) {
    let path = temp.path().to_path_buf();
    if let Err(err) = temp.close() {
        warn!(temp = %path.display(), error = %err, "failed to remove temporary archive");
    }
}
