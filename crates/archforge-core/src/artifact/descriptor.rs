use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::checksum::{validate_digest, ChecksumAlgorithm, ChecksumFormatError};

/// Identity of a built archive. The digest is authoritative for change
/// detection; the size is informational.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub output_path: PathBuf,
    pub byte_size: u64,
    pub content_digest: String,
}

impl ArtifactDescriptor {
    pub fn new(
        output_path: PathBuf,
        byte_size: u64,
        content_digest: String,
    ) -> Result<Self, ChecksumFormatError> {
        validate_digest(ChecksumAlgorithm::Sha256, &content_digest)?;
        Ok(Self {
            output_path,
            byte_size,
            content_digest,
        })
    }

    pub fn is_unchanged_from(&self, previous: &ArtifactDescriptor) -> bool {
        self.content_digest == previous.content_digest
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(contents: &str) -> Result<Self, DescriptorParseError> {
        let parsed: ArtifactDescriptor = serde_json::from_str(contents)?;
        validate_digest(ChecksumAlgorithm::Sha256, &parsed.content_digest)?;
        Ok(parsed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorParseError {
    #[error("failed to parse artifact descriptor: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Digest(#[from] ChecksumFormatError),
}
