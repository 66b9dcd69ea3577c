pub mod checksum;
pub mod descriptor;

pub use checksum::{digest_bytes, digest_reader, ChecksumAlgorithm, ChecksumFormatError};
pub use descriptor::ArtifactDescriptor;
