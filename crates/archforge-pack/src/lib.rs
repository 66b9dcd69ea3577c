use std::io::{Seek, Write};
use std::path::Path;

use archforge_core::{ArchiveEntry, ArchiveError, ArchiveFormat, ArtifactDescriptor, SourceSpec};
use tracing::{debug, info};

pub mod atomic;
pub mod describe;
pub mod resolve;
pub mod walk;
pub mod zip;

pub use atomic::write_atomic;
pub use describe::{describe, describe_file};
pub use resolve::{resolve, ResolvedEntries};
pub use walk::{walk, DirectoryWalker, WalkedFile};
pub use self::zip::ZipPacker;

pub trait ArchiveSink: Write + Seek {}

impl<T: Write + Seek> ArchiveSink for T {}

/// Serializes entries in arrival order and returns the archive's byte size.
/// `destination` only labels errors; the bytes go to `sink`.
pub trait ArchiveWriter {
    fn format(&self) -> ArchiveFormat;

    fn write(
        &self,
        entries: &mut dyn Iterator<Item = Result<ArchiveEntry, ArchiveError>>,
        sink: &mut dyn ArchiveSink,
        destination: &Path,
    ) -> Result<u64, ArchiveError>;
}

pub fn writer_for(format: ArchiveFormat) -> Box<dyn ArchiveWriter> {
    match format {
        ArchiveFormat::Zip => Box::new(ZipPacker),
    }
}

/// Builds an archive of `spec` at `output_path` and describes the result.
/// The parent directory of `output_path` must already exist. The archive is
/// described before it is renamed into place, so the rename is the last step
/// that can fail. A directory source never picks up the archive itself or its
/// temporary file.
pub fn build_archive(
    spec: &SourceSpec,
    format: ArchiveFormat,
    output_path: &Path,
) -> Result<ArtifactDescriptor, ArchiveError> {
    let writer = writer_for(format);
    debug!(
        source = spec.kind(),
        format = %writer.format(),
        output = %output_path.display(),
        "building archive"
    );
    let mut entries = resolve(spec)?;
    entries.exclude(output_path);
    let descriptor = write_atomic(output_path, |file, temp_path| {
        entries.exclude(temp_path);
        let written = writer.write(&mut entries, &mut *file, output_path)?;
        let descriptor = describe_file(file, output_path)?;
        if descriptor.byte_size != written {
            return Err(ArchiveError::write_failed(
                output_path,
                format!(
                    "wrote {} bytes but found {} on disk",
                    written, descriptor.byte_size
                ),
            ));
        }
        Ok(descriptor)
    })?;
    info!(
        output = %output_path.display(),
        bytes = descriptor.byte_size,
        sha256 = %descriptor.content_digest,
        "archive committed"
    );
    Ok(descriptor)
}
