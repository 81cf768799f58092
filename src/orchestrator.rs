//! Drives organize, preview, undo and history over an explicit history store.

use crate::config::{CompiledFilters, Config};
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::FileMapper;
use crate::file_organizer::FileOrganizer;
use crate::history::{
    Batch, BatchSummary, HistoryStore, MoveRecord, SkippedFile, is_recordable,
};
use crate::namer::{FileEntry, OrganizeMode, folder_name};
use crate::undo::{UndoManager, UndoOutcome};
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Parameters of one organize run.
#[derive(Debug, Clone)]
pub struct OrganizeRequest {
    pub source: PathBuf,
    /// Where destination folders are created. `None` organizes in place.
    pub destination: Option<PathBuf>,
    pub mode: OrganizeMode,
}

impl OrganizeRequest {
    pub fn new(source: impl Into<PathBuf>, mode: OrganizeMode) -> Self {
        Self {
            source: source.into(),
            destination: None,
            mode,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// The directory destination folders go under.
    pub fn destination_root(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.source)
    }
}

/// One file of a dry run and the folder it would go to.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub path: PathBuf,
    pub folder: String,
}

/// Classifies, names and moves files, recording every move in `history`.
pub struct Orchestrator<H: HistoryStore> {
    mapper: FileMapper,
    filters: CompiledFilters,
    history: H,
    /// Never organized, even if it sits in the source directory.
    history_path: Option<PathBuf>,
}

impl<H: HistoryStore> Orchestrator<H> {
    /// Builds an orchestrator from configuration and a history store.
    pub fn new(config: &Config, history: H) -> OrganizeResult<Self> {
        Ok(Self {
            mapper: config.file_mapper(),
            filters: config.compile_filters()?,
            history,
            history_path: None,
        })
    }

    /// Excludes the history log file from organize runs.
    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Moves every top-level file of the source into its destination folder.
    ///
    /// Directories are validated before anything is moved; an invalid source
    /// or destination aborts the run. Per-file failures, including paths the
    /// log cannot store, are collected in [`Batch::skipped`] and the run
    /// continues. Each successful move is appended to the history log
    /// immediately, in processing order. If that append fails the file is
    /// moved back and the run stops, so no move is ever left unrecorded.
    pub fn organize(
        &mut self,
        request: &OrganizeRequest,
        progress: &ProgressBar,
    ) -> OrganizeResult<Batch> {
        let files = self.collect_files(&request.source)?;
        let destination_root = request.destination_root();
        prepare_destination(destination_root)?;

        let mut batch = Batch::new(self.history.next_batch_id()?);
        info!(
            batch = batch.id,
            source = %request.source.display(),
            destination = %destination_root.display(),
            mode = %request.mode,
            files = files.len(),
            "organizing"
        );

        progress.set_length(files.len() as u64);
        for path in files {
            let entry = FileEntry::from_path(&path);
            progress.set_message(entry.file_name());
            let folder = folder_name(&entry, request.mode, &self.mapper);

            if !is_recordable(&path) || !is_recordable(destination_root) {
                warn!(path = %path.display(), "skipping file with a name that is not valid UTF-8");
                batch.skipped.push(SkippedFile {
                    path,
                    reason: "path is not valid UTF-8 and cannot be recorded in the history log"
                        .to_string(),
                });
                progress.inc(1);
                continue;
            }

            let folder_existed = destination_root.join(&folder).is_dir();
            match FileOrganizer::move_file(&path, destination_root, &folder) {
                Ok(destination) => {
                    let record = MoveRecord::new(batch.id, path, destination)
                        .with_created_folder(!folder_existed);
                    if let Err(e) = self.history.append(&record) {
                        roll_back(&record);
                        return Err(e);
                    }
                    batch.records.push(record);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    batch.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
            progress.inc(1);
        }

        Ok(batch)
    }

    /// Computes where each file would go without touching the filesystem.
    pub fn preview(&self, request: &OrganizeRequest) -> OrganizeResult<Vec<PlannedMove>> {
        let files = self.collect_files(&request.source)?;
        if let Some(destination) = &request.destination
            && destination.exists()
            && !destination.is_dir()
        {
            return Err(not_a_directory(destination));
        }

        Ok(files
            .into_iter()
            .map(|path| {
                let entry = FileEntry::from_path(&path);
                PlannedMove {
                    folder: folder_name(&entry, request.mode, &self.mapper),
                    path,
                }
            })
            .collect())
    }

    /// Reverts the most recent batch with moves left to revert.
    pub fn undo(&mut self, progress: &ProgressBar) -> OrganizeResult<UndoOutcome> {
        UndoManager::undo(&mut self.history, progress)
    }

    /// Per-batch summary of the whole log.
    pub fn batches(&self) -> OrganizeResult<Vec<BatchSummary>> {
        self.history.batches()
    }

    /// Lists the files in `source` that an organize run would pick up, sorted by name.
    fn collect_files(&self, source: &Path) -> OrganizeResult<Vec<PathBuf>> {
        if !source.is_dir() {
            return Err(OrganizeError::InvalidDirectory {
                path: source.to_path_buf(),
                reason: if source.exists() {
                    "not a directory".to_string()
                } else {
                    "source directory does not exist".to_string()
                },
            });
        }

        let entries = fs::read_dir(source).map_err(|e| OrganizeError::InvalidDirectory {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .map(|entry| entry.path())
            .filter(|path| self.filters.should_include(path))
            .filter(|path| !self.is_history_file(path))
            .collect();
        files.sort();

        debug!(source = %source.display(), count = files.len(), "collected files");
        Ok(files)
    }

    fn is_history_file(&self, path: &Path) -> bool {
        let Some(history_path) = &self.history_path else {
            return false;
        };
        match (fs::canonicalize(path), fs::canonicalize(history_path)) {
            (Ok(a), Ok(b)) => a == b,
            _ => path == history_path,
        }
    }
}

fn not_a_directory(path: &Path) -> OrganizeError {
    OrganizeError::InvalidDirectory {
        path: path.to_path_buf(),
        reason: "not a directory".to_string(),
    }
}

/// Puts a file back after its move could not be recorded.
fn roll_back(record: &MoveRecord) {
    match FileOrganizer::relocate(&record.destination_path, &record.source_path) {
        Ok(()) => {
            if record.created_folder
                && let Some(folder) = record.destination_path.parent()
            {
                let _ = fs::remove_dir(folder);
            }
        }
        Err(e) => error!(
            from = %record.destination_path.display(),
            to = %record.source_path.display(),
            error = %e,
            "could not move back a file whose move was not recorded"
        ),
    }
}

/// Creates the destination root if needed; it must end up a directory.
fn prepare_destination(root: &Path) -> OrganizeResult<()> {
    if root.exists() {
        if !root.is_dir() {
            return Err(not_a_directory(root));
        }
        return Ok(());
    }
    fs::create_dir_all(root).map_err(|e| OrganizeError::DirectoryCreationFailed {
        path: root.to_path_buf(),
        source: e,
    })
}
