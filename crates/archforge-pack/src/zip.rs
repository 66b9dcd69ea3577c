use std::cell::Cell;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use archforge_core::entry::validate_entry_name;
use archforge_core::{ArchiveEntry, ArchiveError, ArchiveFormat, EntryContent};
use tracing::debug;

use crate::{ArchiveSink, ArchiveWriter};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Writes ZIP archives that depend only on entry names, contents, and modes:
/// every entry is deflated and stamped 1980-01-01 00:00:00.
pub struct ZipPacker;

impl ArchiveWriter for ZipPacker {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn write(
        &self,
        entries: &mut dyn Iterator<Item = Result<ArchiveEntry, ArchiveError>>,
        sink: &mut dyn ArchiveSink,
        destination: &Path,
    ) -> Result<u64, ArchiveError> {
        let timestamp = ::zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
            .map_err(|_| ArchiveError::write_failed(destination, "invalid zip timestamp"))?;
        let base_options = ::zip::write::FileOptions::<()>::default()
            .compression_method(::zip::CompressionMethod::Deflated)
            .last_modified_time(timestamp);

        let aborted = Cell::new(false);
        let mut writer = ::zip::ZipWriter::new(AbortableSink {
            inner: sink,
            aborted: &aborted,
        });
        if let Err(err) = write_entries(&mut writer, entries, base_options, destination) {
            aborted.set(true);
            return Err(err);
        }
        let mut sink = writer
            .finish()
            .map_err(|err| ArchiveError::write_failed(destination, err))?;
        let size = sink
            .seek(SeekFrom::End(0))
            .map_err(|err| ArchiveError::write_failed(destination, err))?;
        Ok(size)
    }
}

fn write_entries<W: Write + Seek>(
    writer: &mut ::zip::ZipWriter<W>,
    entries: &mut dyn Iterator<Item = Result<ArchiveEntry, ArchiveError>>,
    base_options: ::zip::write::FileOptions<'_, ()>,
    destination: &Path,
) -> Result<(), ArchiveError> {
    let mut seen = HashSet::new();
    for entry in entries {
        let entry = entry?;
        validate_entry_name(&entry.name)?;
        if !seen.insert(entry.name.clone()) {
            return Err(ArchiveError::DuplicateEntryName { name: entry.name });
        }
        let options = base_options.unix_permissions(entry.mode);
        if entry.is_directory {
            writer
                .add_directory(entry.name.as_str(), options)
                .map_err(|err| ArchiveError::write_failed(destination, err))?;
            debug!(entry = %entry.name, "added directory entry");
            continue;
        }
        writer
            .start_file(entry.name.as_str(), options)
            .map_err(|err| ArchiveError::write_failed(destination, err))?;
        let copied = match &entry.content {
            EntryContent::Bytes(bytes) => {
                writer
                    .write_all(bytes)
                    .map_err(|err| ArchiveError::write_failed(destination, err))?;
                bytes.len() as u64
            }
            EntryContent::File(path) => copy_file(path, writer, destination)?,
        };
        debug!(entry = %entry.name, bytes = copied, mode = entry.mode, "added entry");
    }
    Ok(())
}

/// Sink wrapper that goes inert once the build has failed. `ZipWriter`
/// finalizes itself on drop; after an abort that finalization must not touch
/// the temporary file or report on stderr.
struct AbortableSink<'a> {
    inner: &'a mut dyn ArchiveSink,
    aborted: &'a Cell<bool>,
}

impl AbortableSink<'_> {
    fn guard<T>(&self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.aborted.set(true);
        }
        result
    }
}

impl Write for AbortableSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.aborted.get() {
            return Ok(buf.len());
        }
        let result = self.inner.write(buf);
        self.guard(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.aborted.get() {
            return Ok(());
        }
        let result = self.inner.flush();
        self.guard(result)
    }
}

impl Seek for AbortableSink<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.aborted.get() {
            return Ok(0);
        }
        let result = self.inner.seek(pos);
        self.guard(result)
    }
}

// Read errors belong to the source, write errors to the archive.
fn copy_file<W: Write>(
    path: &Path,
    writer: &mut W,
    destination: &Path,
) -> Result<u64, ArchiveError> {
    let mut input = fs::File::open(path).map_err(|err| ArchiveError::unreadable(path, err))?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(ArchiveError::unreadable(path, err)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|err| ArchiveError::write_failed(destination, err))?;
        copied += read as u64;
    }
    Ok(copied)
}
