/// Reverting the most recent organize run.
///
/// Undo reads the last batch that still has moves to revert from the
/// history log and walks it backwards, moving each file from its destination
/// back to where it came from.
use crate::error::OrganizeResult;
use crate::file_organizer::FileOrganizer;
use crate::history::{HistoryStore, MoveRecord};
use indicatif::ProgressBar;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of an undo call.
#[derive(Debug)]
pub enum UndoOutcome {
    /// The log holds no batch with moves left to revert. Nothing was touched.
    NothingToUndo,
    /// A batch was processed.
    Reverted(UndoReport),
}

/// What happened to each record of the undone batch.
#[derive(Debug)]
pub struct UndoReport {
    pub batch_id: u64,
    /// Number of files moved back to their original location.
    pub restored_files: usize,
    /// Records whose destination file no longer exists.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Records whose reversal failed; left open for a later retry.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files that were occupying an original location and were renamed aside.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    fn new(batch_id: u64) -> Self {
        Self {
            batch_id,
            restored_files: 0,
            skipped_files: Vec::new(),
            failed_restores: Vec::new(),
            backups: Vec::new(),
        }
    }

    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Reverses organize runs recorded in a [`HistoryStore`].
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent batch that still has moves to revert.
    ///
    /// Records are processed in reverse insertion order. Each record is
    /// marked undone as soon as its file is back in place. A record whose
    /// destination file has disappeared is skipped with a warning and also
    /// marked undone, since there is nothing left to move. A record whose
    /// move fails stays open.
    ///
    /// Destination folders that the batch created and that are empty
    /// afterwards are removed. Folders that existed before the batch are kept.
    ///
    /// # Errors
    ///
    /// Fails without touching the filesystem if the history log cannot be
    /// read or is corrupt.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use foldersort::history::JsonlHistory;
    /// use foldersort::undo::{UndoManager, UndoOutcome};
    /// use indicatif::ProgressBar;
    ///
    /// let mut history = JsonlHistory::new("/home/me/.local/share/foldersort/history.jsonl");
    /// match UndoManager::undo(&mut history, &ProgressBar::hidden()) {
    ///     Ok(UndoOutcome::NothingToUndo) => println!("Nothing to undo"),
    ///     Ok(UndoOutcome::Reverted(report)) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo<H: HistoryStore + ?Sized>(
        history: &mut H,
        progress: &ProgressBar,
    ) -> OrganizeResult<UndoOutcome> {
        let batch = history.last_batch()?;
        let Some(batch_id) = batch.first().map(|r| r.batch_id) else {
            return Ok(UndoOutcome::NothingToUndo);
        };

        let mut report = UndoReport::new(batch_id);
        let created_dirs: BTreeSet<&Path> = batch
            .iter()
            .filter(|r| r.created_folder)
            .filter_map(|r| r.destination_path.parent())
            .collect();
        let pending: Vec<&MoveRecord> = batch.iter().filter(|r| !r.undone).collect();
        progress.set_length(pending.len() as u64);

        let mut touched_dirs = BTreeSet::new();
        for record in pending.into_iter().rev() {
            progress.set_message(display_name(&record.destination_path));

            if !record.destination_path.exists() {
                warn!(path = %record.destination_path.display(), "file no longer at recorded destination, skipping");
                report.skipped_files.push((
                    record.destination_path.clone(),
                    "File not found at expected location".to_string(),
                ));
                history.mark_undone(std::slice::from_ref(record))?;
                progress.inc(1);
                continue;
            }

            match Self::restore_file(record) {
                Ok(backup) => {
                    debug!(from = %record.destination_path.display(), to = %record.source_path.display(), "restored file");
                    history.mark_undone(std::slice::from_ref(record))?;
                    report.restored_files += 1;
                    report.backups.extend(backup);
                    if let Some(parent) = record.destination_path.parent()
                        && created_dirs.contains(parent)
                    {
                        touched_dirs.insert(parent.to_path_buf());
                    }
                }
                Err(reason) => {
                    warn!(path = %record.destination_path.display(), %reason, "could not restore file");
                    report
                        .failed_restores
                        .push((record.destination_path.clone(), reason));
                }
            }
            progress.inc(1);
        }

        for dir in touched_dirs {
            Self::remove_if_empty(&dir);
        }

        Ok(UndoOutcome::Reverted(report))
    }

    /// Moves one file back to its original location.
    ///
    /// Recreates the original parent directory if needed. If something else
    /// now occupies the original path it is renamed aside first, and the
    /// backup path is returned.
    fn restore_file(record: &MoveRecord) -> Result<Option<PathBuf>, String> {
        if let Some(parent) = record.source_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Could not recreate {}: {}", parent.display(), e))?;
        }

        let mut backup = None;
        if record.source_path.exists() {
            let backup_path = Self::generate_backup_path(&record.source_path);
            fs::rename(&record.source_path, &backup_path)
                .map_err(|e| format!("Could not backup conflicting file: {}", e))?;
            backup = Some(backup_path);
        }

        FileOrganizer::relocate(&record.destination_path, &record.source_path)
            .map_err(|e| format!("Failed to restore file: {}", e))?;

        Ok(backup)
    }

    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = display_name(original_path);
        let candidate = original_path.with_file_name(format!("{}.bak.{}", filename, timestamp));
        FileOrganizer::unique_destination(&candidate).unwrap_or(candidate)
    }

    fn remove_if_empty(dir: &Path) {
        let is_empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(dir).is_ok() {
            debug!(dir = %dir.display(), "removed empty folder");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}
