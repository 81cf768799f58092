//! Persistent move history.
//!
//! Every successful move is appended to the log as a [`MoveRecord`]. Records
//! produced by one organize run share a `batch_id`, and batch ids strictly
//! increase across runs. Records are never removed; undo only flips their
//! `undone` flag and stamps `undone_at`.
//!
//! The on-disk format is JSON Lines, one record per line:
//!
//! ```text
//! {"batch_id":1,"source_path":"/in/a.txt","destination_path":"/in/Documents/a.txt","timestamp":"2024-03-09T10:00:00Z","undone":false,"created_folder":true}
//! {"batch_id":1,"source_path":"/in/b.txt","destination_path":"/in/Documents/b.txt","timestamp":"2024-03-09T10:00:00Z","undone":true,"undone_at":"2024-03-09T11:30:00Z"}
//! ```
//!
//! `created_folder` and `undone_at` are omitted when false or unset.

use crate::error::{OrganizeError, OrganizeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One completed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub batch_id: u64,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub undone: bool,
    /// When the move was reverted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undone_at: Option<DateTime<Utc>>,
    /// Whether this move created its destination folder.
    #[serde(default, skip_serializing_if = "is_false")]
    pub created_folder: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl MoveRecord {
    /// Creates a record for a move that just happened.
    pub fn new(batch_id: u64, source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            batch_id,
            source_path,
            destination_path,
            timestamp: Utc::now(),
            undone: false,
            undone_at: None,
            created_folder: false,
        }
    }

    /// Marks the record as the one whose move created its destination folder.
    pub fn with_created_folder(mut self, created_folder: bool) -> Self {
        self.created_folder = created_folder;
        self
    }

    /// Whether `other` describes the same move, ignoring its undo state.
    fn same_move(&self, other: &MoveRecord) -> bool {
        self.batch_id == other.batch_id
            && self.source_path == other.source_path
            && self.destination_path == other.destination_path
            && self.timestamp == other.timestamp
    }
}

/// Whether `path` can be stored in a record. Log lines are UTF-8 JSON, so
/// paths that are not valid UTF-8 cannot be recorded and must not be moved.
pub fn is_recordable(path: &Path) -> bool {
    path.to_str().is_some()
}

/// A file that an organize run could not move.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// The outcome of one organize run: its id, the moves it recorded in
/// processing order, and the files it skipped.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: u64,
    pub records: Vec<MoveRecord>,
    pub skipped: Vec<SkippedFile>,
}

impl Batch {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn moved_count(&self) -> usize {
        self.records.len()
    }
}

/// Where a batch stands with respect to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Applied,
    PartiallyUndone,
    Undone,
}

/// Per-batch view of the log, as shown by `history`.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub batch_id: u64,
    pub started_at: DateTime<Utc>,
    pub record_count: usize,
    pub undone_count: usize,
    /// Most recent undo of any record in the batch.
    pub undone_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn status(&self) -> BatchStatus {
        if self.undone_count == 0 {
            BatchStatus::Applied
        } else if self.undone_count == self.record_count {
            BatchStatus::Undone
        } else {
            BatchStatus::PartiallyUndone
        }
    }
}

/// Storage for move records.
///
/// Implementors provide the three primitive operations; batch queries are
/// derived from them.
pub trait HistoryStore {
    /// Appends one record after all existing ones.
    fn append(&mut self, record: &MoveRecord) -> OrganizeResult<()>;

    /// Returns every record in insertion order.
    fn records(&self) -> OrganizeResult<Vec<MoveRecord>>;

    /// Sets `undone = true` and stamps `undone_at` on each stored record
    /// matching one of `records`. Records already undone keep their stamp.
    fn mark_undone(&mut self, records: &[MoveRecord]) -> OrganizeResult<()>;

    /// The id the next organize run should use.
    fn next_batch_id(&self) -> OrganizeResult<u64> {
        let highest = self.records()?.iter().map(|r| r.batch_id).max();
        Ok(highest.map_or(1, |id| id + 1))
    }

    /// All records of the highest batch that still has a record not undone,
    /// in insertion order. Empty when there is nothing to undo.
    fn last_batch(&self) -> OrganizeResult<Vec<MoveRecord>> {
        let records = self.records()?;
        let target = records
            .iter()
            .filter(|r| !r.undone)
            .map(|r| r.batch_id)
            .max();

        Ok(match target {
            Some(id) => records.into_iter().filter(|r| r.batch_id == id).collect(),
            None => Vec::new(),
        })
    }

    /// One summary per batch, oldest first.
    fn batches(&self) -> OrganizeResult<Vec<BatchSummary>> {
        let mut summaries: BTreeMap<u64, BatchSummary> = BTreeMap::new();
        for record in self.records()? {
            let summary = summaries
                .entry(record.batch_id)
                .or_insert_with(|| BatchSummary {
                    batch_id: record.batch_id,
                    started_at: record.timestamp,
                    record_count: 0,
                    undone_count: 0,
                    undone_at: None,
                });
            summary.started_at = summary.started_at.min(record.timestamp);
            summary.record_count += 1;
            if record.undone {
                summary.undone_count += 1;
            }
            summary.undone_at = summary.undone_at.max(record.undone_at);
        }
        Ok(summaries.into_values().collect())
    }
}

fn flag_matching(stored: &mut [MoveRecord], targets: &[MoveRecord]) {
    let now = Utc::now();
    for record in stored.iter_mut() {
        if !record.undone && targets.iter().any(|t| t.same_move(record)) {
            record.undone = true;
            record.undone_at = Some(now);
        }
    }
}

/// History kept in a JSON Lines file.
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    /// File name used inside the default data directory.
    pub const FILE_NAME: &'static str = "history.jsonl";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/foldersort/history.jsonl` for the current user, if a
    /// home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "foldersort")
            .map(|dirs| dirs.data_dir().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> OrganizeError {
        OrganizeError::HistoryWriteFailed {
            path: self.path.clone(),
            source,
        }
    }

    fn ensure_parent(&self) -> OrganizeResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }

    fn encode(&self, record: &MoveRecord) -> OrganizeResult<String> {
        serde_json::to_string(record)
            .map_err(|e| self.write_error(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Makes sure the next append starts on a fresh line.
    ///
    /// A last line without its newline is left by an interrupted write. It is
    /// terminated if it holds a complete record and cut off otherwise.
    fn repair_tail(&self) -> OrganizeResult<()> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.write_error(e)),
        };
        if contents.is_empty() || contents.ends_with(b"\n") {
            return Ok(());
        }

        let start = contents
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;

        if serde_json::from_slice::<MoveRecord>(&contents[start..]).is_ok() {
            file.write_all(b"\n").map_err(|e| self.write_error(e))?;
        } else {
            warn!(path = %self.path.display(), "discarding partially written record at end of history log");
            file.set_len(start as u64)
                .map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }
}

impl HistoryStore for JsonlHistory {
    fn append(&mut self, record: &MoveRecord) -> OrganizeResult<()> {
        self.ensure_parent()?;
        let line = self.encode(record)?;
        self.repair_tail()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        writeln!(file, "{line}").map_err(|e| self.write_error(e))?;
        file.sync_data().map_err(|e| self.write_error(e))?;
        Ok(())
    }

    /// Reads the whole log.
    ///
    /// An unparsable last line that lacks its newline is an interrupted
    /// append and is ignored; any other unparsable line is corruption.
    fn records(&self) -> OrganizeResult<Vec<MoveRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(OrganizeError::HistoryReadFailed {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let interrupted_tail = !content.is_empty() && !content.ends_with('\n');
        let line_count = content.lines().count();

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(_) if interrupted_tail && index + 1 == line_count => {
                    warn!(path = %self.path.display(), line = index + 1, "ignoring partially written record at end of history log");
                }
                Err(e) => {
                    return Err(OrganizeError::CorruptHistory {
                        line: index + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(records)
    }

    fn mark_undone(&mut self, targets: &[MoveRecord]) -> OrganizeResult<()> {
        let mut records = self.records()?;
        flag_matching(&mut records, targets);

        let mut contents = String::new();
        for record in &records {
            contents.push_str(&self.encode(record)?);
            contents.push('\n');
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, contents).map_err(|e| self.write_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.write_error(e))?;
        Ok(())
    }
}

/// History held in memory, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    records: Vec<MoveRecord>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, record: &MoveRecord) -> OrganizeResult<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn records(&self) -> OrganizeResult<Vec<MoveRecord>> {
        Ok(self.records.clone())
    }

    fn mark_undone(&mut self, targets: &[MoveRecord]) -> OrganizeResult<()> {
        flag_matching(&mut self.records, targets);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(batch_id: u64, name: &str) -> MoveRecord {
        MoveRecord::new(
            batch_id,
            PathBuf::from(format!("/src/{name}")),
            PathBuf::from(format!("/dst/Other/{name}")),
        )
    }

    #[test]
    fn test_empty_history_has_nothing_to_undo() {
        let history = MemoryHistory::new();
        assert!(history.last_batch().unwrap().is_empty());
        assert_eq!(history.next_batch_id().unwrap(), 1);
        assert!(history.batches().unwrap().is_empty());
    }

    #[test]
    fn test_last_batch_targets_highest_open_batch() {
        let mut history = MemoryHistory::new();
        let a = record(1, "a");
        let b = record(2, "b");
        let c = record(2, "c");
        for r in [&a, &b, &c] {
            history.append(r).unwrap();
        }

        let last = history.last_batch().unwrap();
        assert_eq!(last, vec![b.clone(), c.clone()]);
        assert_eq!(history.next_batch_id().unwrap(), 3);

        history.mark_undone(&[b.clone()]).unwrap();
        assert_eq!(history.last_batch().unwrap().len(), 2);

        history.mark_undone(&[c]).unwrap();
        let last = history.last_batch().unwrap();
        assert_eq!(last, vec![a]);

        // Undone batches still count towards the next id.
        assert_eq!(history.next_batch_id().unwrap(), 3);
    }

    #[test]
    fn test_batches_report_status() {
        let mut history = MemoryHistory::new();
        let a = record(1, "a");
        let b = record(1, "b");
        let c = record(2, "c");
        for r in [&a, &b, &c] {
            history.append(r).unwrap();
        }
        history.mark_undone(&[a]).unwrap();

        let batches = history.batches().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].batch_id, 1);
        assert_eq!(batches[0].status(), BatchStatus::PartiallyUndone);
        assert_eq!(batches[1].status(), BatchStatus::Applied);
    }

    #[test]
    fn test_jsonl_roundtrip_and_mark_undone() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("history.jsonl");
        let mut history = JsonlHistory::new(&path);

        let a = record(1, "a.txt");
        let b = record(1, "b.txt");
        history.append(&a).unwrap();
        history.append(&b).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"batch_id\":1"));
        assert!(content.contains("\"undone\":false"));

        history.mark_undone(&[b.clone()]).unwrap();

        let reopened = JsonlHistory::new(&path);
        assert_eq!(reopened.path(), path.as_path());
        let records = reopened.records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].undone);
        assert!(records[1].undone);
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_jsonl_missing_file_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let history = JsonlHistory::new(temp_dir.path().join("none.jsonl"));
        assert!(history.records().unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_corrupt_line_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("history.jsonl");
        let mut history = JsonlHistory::new(&path);
        history.append(&record(1, "a")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        match history.last_batch() {
            Err(OrganizeError::CorruptHistory { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt history, got {other:?}"),
        }
    }

    #[test]
    fn test_mark_undone_stamps_time_once() {
        let mut history = MemoryHistory::new();
        let a = record(1, "a");
        let b = record(1, "b");
        history.append(&a).unwrap();
        history.append(&b).unwrap();

        history.mark_undone(&[a.clone()]).unwrap();
        let first = history.records().unwrap()[0].undone_at;
        assert!(first.is_some());
        assert!(history.records().unwrap()[1].undone_at.is_none());

        history.mark_undone(&[a, b]).unwrap();
        let records = history.records().unwrap();
        assert_eq!(records[0].undone_at, first);
        assert!(records[1].undone_at >= first);

        let batches = history.batches().unwrap();
        assert_eq!(batches[0].undone_at, records[1].undone_at);
    }

    #[test]
    fn test_jsonl_undo_time_and_created_folder_persist() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("history.jsonl");
        let mut history = JsonlHistory::new(&path);
        let a = record(1, "a").with_created_folder(true);
        history.append(&a).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("undone_at"));

        history.mark_undone(&[a]).unwrap();

        let records = JsonlHistory::new(&path).records().unwrap();
        assert!(records[0].created_folder);
        assert!(records[0].undone_at.is_some());
    }

    #[test]
    fn test_jsonl_interrupted_append_is_ignored_then_discarded() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("history.jsonl");
        let mut history = JsonlHistory::new(&path);
        history.append(&record(1, "a")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{{\"batch_id\":1,\"sour").unwrap();

        assert_eq!(history.records().unwrap().len(), 1);
        assert_eq!(history.last_batch().unwrap().len(), 1);

        history.append(&record(2, "b")).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));
        let ids: Vec<_> = history.records().unwrap().iter().map(|r| r.batch_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_jsonl_complete_record_missing_newline_is_kept() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("history.jsonl");
        let mut history = JsonlHistory::new(&path);
        let a = record(1, "a");
        let b = record(1, "b");
        history.append(&a).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{}", serde_json::to_string(&b).unwrap()).unwrap();

        let c = record(2, "c");
        history.append(&c).unwrap();
        assert_eq!(history.records().unwrap(), vec![a, b, c]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_are_not_recordable() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        assert!(is_recordable(Path::new("/in/café.txt")));
        assert!(!is_recordable(&Path::new("/in").join(OsStr::from_bytes(b"caf\xe9.txt"))));
    }

    #[test]
    fn test_jsonl_blank_lines_are_ignored() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("history.jsonl");
        let mut history = JsonlHistory::new(&path);
        history.append(&record(4, "a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file).unwrap();

        assert_eq!(history.next_batch_id().unwrap(), 5);
    }
}
