//! Destination folder naming.
//!
//! A [`FileEntry`] is read fresh from the filesystem on every run. Depending
//! on the [`OrganizeMode`] its destination folder is either the category of
//! its extension or its creation date.

use crate::error::MetadataError;
use crate::file_category::{FileMapper, normalize_extension};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Folder used in date mode when the creation time cannot be read.
pub const UNKNOWN_DATE_FOLDER: &str = "Unknown";

/// Date folders are named `YYYY-MM-DD`.
pub const DATE_FOLDER_FORMAT: &str = "%Y-%m-%d";

/// How files are grouped into destination folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrganizeMode {
    /// One folder per category, e.g. `Images/`.
    Type,
    /// One folder per creation date, e.g. `2024-03-09/`.
    Date,
}

impl fmt::Display for OrganizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizeMode::Type => f.write_str("type"),
            OrganizeMode::Date => f.write_str("date"),
        }
    }
}

/// A file found in the source directory.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Lowercase extension including its leading dot, empty if the file has none.
    pub extension: String,
    pub created_at: Result<DateTime<Local>, MetadataError>,
}

impl FileEntry {
    /// Reads the extension and creation time of `path`.
    ///
    /// Metadata failures are kept in `created_at` rather than returned, so a
    /// file with unreadable metadata can still be organized by type.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| normalize_extension(&ext.to_string_lossy()))
            .unwrap_or_default();

        let created_at = fs::metadata(path)
            .map_err(|e| MetadataError::Unreadable(e.to_string()))
            .and_then(|meta| {
                meta.created()
                    .map_err(|_| MetadataError::CreationTimeUnsupported)
            })
            .map(DateTime::<Local>::from);

        Self {
            path: path.to_path_buf(),
            extension,
            created_at,
        }
    }

    /// The file name component, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Derives the destination folder name for `entry` under `mode`.
///
/// # Examples
///
/// ```
/// use foldersort::file_category::FileMapper;
/// use foldersort::namer::{FileEntry, OrganizeMode, folder_name};
/// use foldersort::error::MetadataError;
/// use std::path::PathBuf;
///
/// let entry = FileEntry {
///     path: PathBuf::from("photo.JPG"),
///     extension: ".jpg".to_string(),
///     created_at: Err(MetadataError::CreationTimeUnsupported),
/// };
/// let mapper = FileMapper::default();
/// assert_eq!(folder_name(&entry, OrganizeMode::Type, &mapper), "Images");
/// assert_eq!(folder_name(&entry, OrganizeMode::Date, &mapper), "Unknown");
/// ```
pub fn folder_name(entry: &FileEntry, mode: OrganizeMode, mapper: &FileMapper) -> String {
    match mode {
        OrganizeMode::Type => mapper.classify(&entry.extension).dir_name().to_string(),
        OrganizeMode::Date => match &entry.created_at {
            Ok(created) => created.format(DATE_FOLDER_FORMAT).to_string(),
            Err(e) => {
                tracing::warn!(path = %entry.path.display(), error = %e, "no creation date, using fallback folder");
                UNKNOWN_DATE_FOLDER.to_string()
            }
        },
    }
}
