/// Moving files into destination subfolders.
///
/// This module relocates a single file into `destination_root/folder_name/`,
/// creating the folder on demand and picking a free name when the target is
/// already taken. Files are never overwritten.
use crate::error::{OrganizeError, OrganizeResult};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on `name (n).ext` attempts before a move is given up.
pub const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Relocates files into destination subfolders.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `file_path` into `destination_root/folder_name/` and returns the final path.
    ///
    /// The subfolder is created if absent. If a file of the same name already
    /// exists there, ` (1)`, ` (2)`, ... is appended to the stem until a free
    /// name is found.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use foldersort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let result = FileOrganizer::move_file(
    ///     Path::new("/home/me/Downloads/report.pdf"),
    ///     Path::new("/home/me/Downloads"),
    ///     "Documents",
    /// );
    ///
    /// match result {
    ///     Ok(path) => println!("Moved to {}", path.display()),
    ///     Err(e) => eprintln!("Skipped: {}", e),
    /// }
    /// ```
    pub fn move_file(
        file_path: &Path,
        destination_root: &Path,
        folder_name: &str,
    ) -> OrganizeResult<PathBuf> {
        if !destination_root.is_dir() {
            return Err(OrganizeError::InvalidDirectory {
                path: destination_root.to_path_buf(),
                reason: "destination root does not exist".to_string(),
            });
        }

        let folder_path = destination_root.join(folder_name);
        fs::create_dir_all(&folder_path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: folder_path.clone(),
            source: e,
        })?;

        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::FileMoveFailure {
                from: file_path.to_path_buf(),
                to: folder_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
            })?;

        let destination = Self::unique_destination(&folder_path.join(file_name))?;
        Self::relocate(file_path, &destination)?;

        debug!(from = %file_path.display(), to = %destination.display(), "moved file");
        Ok(destination)
    }

    /// Returns `candidate` if free, otherwise the first free `stem (n).ext` beside it.
    pub fn unique_destination(candidate: &Path) -> OrganizeResult<PathBuf> {
        if !candidate.exists() {
            return Ok(candidate.to_path_buf());
        }

        let parent = candidate.parent().unwrap_or_else(|| Path::new(""));
        let stem = candidate.file_stem().unwrap_or_default();
        let extension = candidate.extension();

        for n in 1..=MAX_COLLISION_SUFFIX {
            // Built from raw OS strings so names that are not UTF-8 keep their bytes.
            let mut name = OsString::from(stem);
            name.push(format!(" ({n})"));
            if let Some(extension) = extension {
                name.push(".");
                name.push(extension);
            }
            let attempt = parent.join(name);
            if !attempt.exists() {
                return Ok(attempt);
            }
        }

        Err(OrganizeError::CollisionsExhausted {
            path: candidate.to_path_buf(),
            attempts: MAX_COLLISION_SUFFIX,
        })
    }

    /// Moves a file, falling back to copy + remove across filesystems.
    pub fn relocate(from: &Path, to: &Path) -> OrganizeResult<()> {
        let move_error = |e: io::Error| OrganizeError::FileMoveFailure {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        };

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), "rename crossed devices, copying instead");
                fs::copy(from, to).map_err(move_error)?;
                if let Err(e) = fs::remove_file(from) {
                    // Original is still in place; drop the copy.
                    let _ = fs::remove_file(to);
                    return Err(move_error(e));
                }
                Ok(())
            }
            Err(e) => Err(move_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let moved = FileOrganizer::move_file(&file_path, base_path, "Documents")
            .expect("Failed to move file");

        let category_dir = base_path.join("Documents");
        assert!(category_dir.is_dir());
        assert!(!file_path.exists());
        assert_eq!(moved, category_dir.join("test.txt"));
        assert!(moved.exists());
    }

    #[test]
    fn test_move_file_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let category_dir = base_path.join("Images");
        fs::create_dir(&category_dir).expect("Failed to create category directory");

        let file_path = base_path.join("test.png");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        FileOrganizer::move_file(&file_path, base_path, "Images").expect("Failed to move file");

        assert!(!file_path.exists());
        assert!(category_dir.join("test.png").exists());
    }

    #[test]
    fn test_move_file_never_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let category_dir = base_path.join("Documents");
        fs::create_dir(&category_dir).expect("Failed to create category directory");
        fs::write(category_dir.join("a.txt"), "existing").expect("Failed to write file");
        fs::write(category_dir.join("a (1).txt"), "existing 1").expect("Failed to write file");

        let file_path = base_path.join("a.txt");
        fs::write(&file_path, "incoming").expect("Failed to write file");

        let moved = FileOrganizer::move_file(&file_path, base_path, "Documents")
            .expect("Failed to move file");

        assert_eq!(moved, category_dir.join("a (2).txt"));
        assert_eq!(fs::read_to_string(category_dir.join("a.txt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(&moved).unwrap(), "incoming");
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let taken = temp_dir.path().join("README");
        fs::write(&taken, "x").expect("Failed to write file");

        let free = FileOrganizer::unique_destination(&taken).unwrap();
        assert_eq!(free, temp_dir.path().join("README (1)"));
    }

    #[test]
    fn test_unique_destination_multiple_dots() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let taken = temp_dir.path().join("backup.tar.gz");
        fs::write(&taken, "x").expect("Failed to write file");

        let free = FileOrganizer::unique_destination(&taken).unwrap();
        assert_eq!(free, temp_dir.path().join("backup.tar (1).gz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unique_destination_keeps_non_utf8_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let taken = temp_dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        fs::write(&taken, "x").expect("Failed to write file");

        let free = FileOrganizer::unique_destination(&taken).unwrap();
        assert_eq!(
            free.file_name().unwrap().as_bytes(),
            b"caf\xe9 (1).txt".as_slice()
        );
    }

    #[test]
    fn test_move_file_invalid_destination_root() {
        let result = FileOrganizer::move_file(
            Path::new("/some/file.txt"),
            Path::new("/non/existent/path"),
            "Documents",
        );
        assert!(matches!(result, Err(OrganizeError::InvalidDirectory { .. })));
    }

    #[test]
    fn test_move_missing_source_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result =
            FileOrganizer::move_file(&temp_dir.path().join("gone.txt"), temp_dir.path(), "Other");
        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
    }
}
