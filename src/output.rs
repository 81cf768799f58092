//! Output formatting and styling module.
//!
//! All user-facing terminal output goes through [`OutputFormatter`], so colors,
//! symbols and table layout stay consistent between commands.

use crate::history::{BatchStatus, BatchSummary};
use chrono::Local;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use foldersort::output::OutputFormatter;
    /// OutputFormatter::success("Organized 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for file operations.
    ///
    /// Returns a hidden bar when `enabled` is false so callers never branch.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use foldersort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(true);
    /// pb.set_length(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(enabled: bool) -> ProgressBar {
        if !enabled {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a table of file counts per destination folder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use foldersort::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(folder_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = folder_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max("Folder".len());

        println!("{:<width$} | {}", "Folder".bold(), "Files".bold());
        println!("{}", "-".repeat(width + 10));

        for (folder, count) in folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder,
                count.to_string().green(),
                plural(*count)
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files)
        );
    }

    /// Prints one row per batch with its start time, size, undo status and
    /// the time of its latest undo.
    pub fn history_table(batches: &[BatchSummary]) {
        Self::header("HISTORY");
        println!(
            "{:>5} | {:<19} | {:>5} | {}",
            "Batch".bold(),
            "Started".bold(),
            "Files".bold(),
            "Status".bold()
        );
        println!("{}", "-".repeat(50));

        for batch in batches {
            let started = batch
                .started_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            let undone_at = batch
                .undone_at
                .map(|at| format!(" at {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")))
                .unwrap_or_default();
            let status = match batch.status() {
                BatchStatus::Applied => "applied".green(),
                BatchStatus::PartiallyUndone => format!(
                    "partially undone ({}/{}){}",
                    batch.undone_count, batch.record_count, undone_at
                )
                .yellow(),
                BatchStatus::Undone => format!("undone{undone_at}").dimmed(),
            };
            println!(
                "{:>5} | {:<19} | {:>5} | {}",
                batch.batch_id, started, batch.record_count, status
            );
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
