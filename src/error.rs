//! Error types shared across the organizer, history log and undo engine.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while organizing files or working with the history log.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// A source or destination directory is missing or not a directory.
    #[error("Invalid directory {}: {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },

    /// Failed to create a destination subfolder.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to relocate a file.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Every numbered variant of the destination name was already taken.
    #[error("No free name left for {} after {attempts} attempts", path.display())]
    CollisionsExhausted { path: PathBuf, attempts: u32 },

    /// Failed to read the history log.
    #[error("Failed to read history log {}: {source}", path.display())]
    HistoryReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the history log.
    #[error("Failed to write history log {}: {source}", path.display())]
    HistoryWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The history log contains a line that is not a valid move record.
    #[error("Cannot determine last batch: history log is corrupt at line {line}: {reason}")]
    CorruptHistory { line: usize, reason: String },

    /// Configuration could not be loaded or compiled.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrganizeError {
    /// Exit code used by the binary when this error aborts a run.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidDirectory { .. } => 2,
            Self::CorruptHistory { .. } => 3,
            Self::Config(_) => 4,
            _ => 1,
        }
    }
}

/// The file's creation timestamp could not be determined.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata unavailable: {0}")]
    Unreadable(String),

    #[error("creation time not supported on this platform or filesystem")]
    CreationTimeUnsupported,
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
