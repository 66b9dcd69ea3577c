use std::io::{self, Read};

use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Sha256 => 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumFormatError {
    #[error("invalid checksum digest '{0}'")]
    InvalidDigest(String),
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Streams `reader` through SHA-256, returning the lowercase hex digest and
/// the number of bytes consumed.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let consumed = io::copy(&mut reader, &mut hasher)?;
    Ok((hex::encode(hasher.finalize()), consumed))
}

pub fn validate_digest(
    algorithm: ChecksumAlgorithm,
    digest: &str,
) -> Result<(), ChecksumFormatError> {
    if digest.len() != algorithm.hex_len()
        || !digest
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch))
    {
        return Err(ChecksumFormatError::InvalidDigest(digest.to_string()));
    }
    Ok(())
}
