use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure of a single archive build. Every variant is terminal for the call
/// that produced it.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid source specification: {message}")]
    InvalidSourceSpec { message: String },

    #[error("source '{}' is unreadable: {message}", path.display())]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("invalid entry name '{name}': {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    #[error("duplicate entry name '{name}'")]
    DuplicateEntryName { name: String },

    #[error("failed to write archive '{}': {message}", path.display())]
    WriteFailed { path: PathBuf, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSourceSpec,
    SourceUnreadable,
    InvalidEntryName,
    DuplicateEntryName,
    WriteFailed,
}

impl ArchiveError {
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        ArchiveError::InvalidSourceSpec {
            message: message.into(),
        }
    }

    pub fn unreadable(path: &Path, err: impl std::fmt::Display) -> Self {
        ArchiveError::SourceUnreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn write_failed(path: &Path, err: impl std::fmt::Display) -> Self {
        ArchiveError::WriteFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::InvalidSourceSpec { .. } => ErrorKind::InvalidSourceSpec,
            ArchiveError::SourceUnreadable { .. } => ErrorKind::SourceUnreadable,
            ArchiveError::InvalidEntryName { .. } => ErrorKind::InvalidEntryName,
            ArchiveError::DuplicateEntryName { .. } => ErrorKind::DuplicateEntryName,
            ArchiveError::WriteFailed { .. } => ErrorKind::WriteFailed,
        }
    }
}
