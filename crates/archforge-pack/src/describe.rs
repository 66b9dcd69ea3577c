use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use archforge_core::artifact::digest_reader;
use archforge_core::{ArchiveError, ArtifactDescriptor};

pub fn describe(output_path: &Path) -> Result<ArtifactDescriptor, ArchiveError> {
    let mut file =
        File::open(output_path).map_err(|err| ArchiveError::write_failed(output_path, err))?;
    describe_file(&mut file, output_path)
}

/// Describes an open archive from its first byte, labelled as `output_path`.
/// Lets the pipeline describe the temporary file before it is committed.
pub fn describe_file(
    file: &mut File,
    output_path: &Path,
) -> Result<ArtifactDescriptor, ArchiveError> {
    let byte_size = file
        .metadata()
        .map_err(|err| ArchiveError::write_failed(output_path, err))?
        .len();
    file.seek(SeekFrom::Start(0))
        .map_err(|err| ArchiveError::write_failed(output_path, err))?;
    let (digest, hashed) = digest_reader(BufReader::new(file))
        .map_err(|err| ArchiveError::write_failed(output_path, err))?;
    if hashed != byte_size {
        return Err(ArchiveError::write_failed(
            output_path,
            format!("archive changed while hashing ({} of {} bytes)", hashed, byte_size),
        ));
    }
    ArtifactDescriptor::new(output_path.to_path_buf(), byte_size, digest)
        .map_err(|err| ArchiveError::write_failed(output_path, err))
}
