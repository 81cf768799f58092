//! Interactive menu.
//!
//! Prompts are written to `output` and answers read from `input`, so the
//! menu can be driven by a terminal or by a script in tests.

use crate::cli::{Command, execute};
use crate::history::HistoryStore;
use crate::namer::OrganizeMode;
use crate::orchestrator::{OrganizeRequest, Orchestrator};
use crate::output::OutputFormatter;
use directories::BaseDirs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const MENU: &str = "\
File Organizer Menu:
  1. Organize by file type
  2. Organize by date
  3. Undo last organization
  4. Show history
  q. Quit";

/// Runs the menu until the user quits or input ends.
///
/// Errors from a single choice are reported and the menu is shown again;
/// only IO errors on `input`/`output` end the loop.
pub fn run_menu<H, R, W>(
    orchestrator: &mut Orchestrator<H>,
    input: &mut R,
    output: &mut W,
    show_progress: bool,
) -> io::Result<()>
where
    H: HistoryStore,
    R: BufRead,
    W: Write,
{
    loop {
        writeln!(output, "\n{MENU}")?;
        let Some(choice) = prompt(input, output, "\nEnter your choice (1-4, q): ")? else {
            return Ok(());
        };

        let command = match choice.as_str() {
            "1" => read_organize(input, output, OrganizeMode::Type)?,
            "2" => read_organize(input, output, OrganizeMode::Date)?,
            "3" => Some(Command::Undo),
            "4" => Some(Command::History),
            "q" | "Q" | "quit" | "exit" => return Ok(()),
            other => {
                writeln!(output, "Invalid choice '{other}'. Please enter 1-4 or q.")?;
                continue;
            }
        };

        let Some(command) = command else {
            return Ok(());
        };
        if let Err(e) = execute(orchestrator, &command, show_progress) {
            OutputFormatter::error(&e.to_string());
        }
    }
}

/// Asks for source and optional destination. `None` means input ended.
fn read_organize<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    mode: OrganizeMode,
) -> io::Result<Option<Command>> {
    let Some(source) = prompt(input, output, "Enter the source directory path: ")? else {
        return Ok(None);
    };
    let Some(destination) = prompt(
        input,
        output,
        "Enter the destination directory (leave blank to organize in place): ",
    )?
    else {
        return Ok(None);
    };

    let mut request = OrganizeRequest::new(expand_home(&source), mode);
    if !destination.is_empty() {
        request = request.with_destination(expand_home(&destination));
    }
    Ok(Some(Command::Organize {
        request,
        dry_run: false,
    }))
}

/// Writes `message` and reads one trimmed line; `None` at end of input.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> io::Result<Option<String>> {
    write!(output, "{message}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
