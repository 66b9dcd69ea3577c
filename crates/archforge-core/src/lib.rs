//! Data model shared by the archive builder: where content comes from, what
//! goes into an archive, and how the finished artifact is identified.

pub mod artifact;
pub mod config;
pub mod entry;
pub mod error;
pub mod format;
pub mod source;

pub use artifact::ArtifactDescriptor;
pub use entry::{ArchiveEntry, EntryContent};
pub use error::{ArchiveError, ErrorKind};
pub use format::ArchiveFormat;
pub use source::{SourceConfig, SourceSpec};
