//! Command dispatch and rendering.
//!
//! This module turns a [`Command`] into calls on an [`Orchestrator`] and
//! prints the outcome through [`OutputFormatter`]. It is shared by the
//! non-interactive subcommands and the interactive menu.

use crate::config::Config;
use crate::error::OrganizeResult;
use crate::history::{Batch, HistoryStore, JsonlHistory};
use crate::orchestrator::{OrganizeRequest, Orchestrator, PlannedMove};
use crate::output::OutputFormatter;
use crate::undo::{UndoOutcome, UndoReport};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// History log used when neither the CLI, the config nor the platform
/// provides a location.
pub const FALLBACK_HISTORY_FILE: &str = ".foldersort_history.jsonl";

/// Represents a CLI command to execute.
#[derive(Debug, Clone)]
pub enum Command {
    /// Organize a directory.
    Organize {
        request: OrganizeRequest,
        /// If true, only show where files would go.
        dry_run: bool,
    },
    /// Undo the most recent organize run.
    Undo,
    /// Show the batches recorded in the history log.
    History,
}

/// Settings shared by every command of one process.
#[derive(Debug, Clone, Default)]
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub show_progress: bool,
}

impl CliContext {
    /// Picks the history log location: `--history`, then `[history] path`,
    /// then the platform data directory.
    pub fn resolve_history_path(&self, config: &Config) -> PathBuf {
        self.history_path
            .clone()
            .or_else(|| config.history.path.clone())
            .or_else(JsonlHistory::default_path)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_HISTORY_FILE))
    }

    /// Loads configuration and opens the history log.
    pub fn open(&self) -> OrganizeResult<Orchestrator<JsonlHistory>> {
        let config = Config::load(self.config_path.as_deref())?;
        let history_path = self.resolve_history_path(&config);
        tracing::debug!(history = %history_path.display(), "opening history log");

        Ok(Orchestrator::new(&config, JsonlHistory::new(&history_path))?
            .with_history_path(history_path))
    }
}

/// Runs one command against the configured history log.
///
/// # Examples
///
/// ```no_run
/// use foldersort::cli::{CliContext, Command, run_cli};
///
/// let ctx = CliContext::default();
/// if let Err(e) = run_cli(Command::Undo, &ctx) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: Command, ctx: &CliContext) -> OrganizeResult<()> {
    let mut orchestrator = ctx.open()?;
    execute(&mut orchestrator, &command, ctx.show_progress)
}

/// Runs one command against an already opened orchestrator.
pub fn execute<H: HistoryStore>(
    orchestrator: &mut Orchestrator<H>,
    command: &Command,
    show_progress: bool,
) -> OrganizeResult<()> {
    match command {
        Command::Organize {
            request,
            dry_run: true,
        } => {
            OutputFormatter::dry_run_notice(&format!(
                "Analyzing contents of: {}",
                request.source.display()
            ));
            let plan = orchestrator.preview(request)?;
            render_preview(&plan);
        }
        Command::Organize {
            request,
            dry_run: false,
        } => {
            OutputFormatter::info(&format!(
                "Organizing {} by {} into {}",
                request.source.display(),
                request.mode,
                request.destination_root().display()
            ));
            let progress = OutputFormatter::create_progress_bar(show_progress);
            let result = orchestrator.organize(request, &progress);
            progress.finish_and_clear();
            render_batch(&result?);
        }
        Command::Undo => {
            OutputFormatter::info("Undoing previous organization...");
            let progress = OutputFormatter::create_progress_bar(show_progress);
            let result = orchestrator.undo(&progress);
            progress.finish_and_clear();
            match result? {
                UndoOutcome::NothingToUndo => OutputFormatter::warning("Nothing to undo."),
                UndoOutcome::Reverted(report) => render_undo(&report),
            }
        }
        Command::History => {
            let batches = orchestrator.batches()?;
            if batches.is_empty() {
                OutputFormatter::plain("No organization history yet.");
            } else {
                OutputFormatter::history_table(&batches);
            }
        }
    }
    Ok(())
}

fn render_batch(batch: &Batch) {
    if batch.records.is_empty() && batch.skipped.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in &batch.records {
        let folder = record
            .destination_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        *counts.entry(folder).or_insert(0) += 1;
    }

    for skipped in &batch.skipped {
        OutputFormatter::error(&format!(
            "Skipped {}: {}",
            skipped.path.display(),
            skipped.reason
        ));
    }

    if !batch.records.is_empty() {
        OutputFormatter::summary_table(&counts, batch.moved_count());
        OutputFormatter::success(&format!(
            "Batch {} complete. Run 'foldersort undo' to revert it.",
            batch.id
        ));
    }
    if !batch.skipped.is_empty() {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be organized. Please review errors above.",
            batch.skipped.len()
        ));
    }
}

fn render_preview(plan: &[PlannedMove]) {
    if plan.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for planned in plan {
        let name = planned
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        OutputFormatter::plain(&format!(" - {} → {}/", name, planned.folder));
        *counts.entry(planned.folder.clone()).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&counts, plan.len());
    OutputFormatter::success("Dry run complete. No files were modified.");
}

fn render_undo(report: &UndoReport) {
    OutputFormatter::success(&format!(
        "Undo of batch {} complete: restored {} file(s).",
        report.batch_id, report.restored_files
    ));

    for backup in &report.backups {
        OutputFormatter::warning(&format!(
            "A different file was at the original location; kept it as {}",
            backup.display()
        ));
    }
    for (path, reason) in &report.skipped_files {
        OutputFormatter::warning(&format!("Skipped {}: {}", path.display(), reason));
    }
    for (path, reason) in &report.failed_restores {
        OutputFormatter::error(&format!("Failed {}: {}", path.display(), reason));
    }
    if !report.failed_restores.is_empty() {
        OutputFormatter::warning(
            "Failed files remain recorded; fix the issues and run undo again.",
        );
    }
}
