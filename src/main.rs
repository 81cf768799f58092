use clap::{Parser, Subcommand};
use foldersort::cli::{CliContext, Command, run_cli};
use foldersort::logging::init_logger;
use foldersort::menu::run_menu;
use foldersort::namer::OrganizeMode;
use foldersort::orchestrator::OrganizeRequest;
use foldersort::output::OutputFormatter;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "foldersort")]
#[command(about = "Sort files into category or date folders, with undo")]
#[command(version)]
struct Cli {
    /// History log file (default: platform data directory)
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// Configuration file (default: ./.foldersortrc.toml or ~/.config/foldersort/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose diagnostic logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Without a subcommand the interactive menu is started.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Move the files of a directory into category or date folders
    Organize {
        /// Directory whose files are organized
        source: PathBuf,

        /// Where folders are created (default: the source directory)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Grouping to use
        #[arg(long, value_enum, default_value_t = OrganizeMode::Type)]
        by: OrganizeMode,

        /// Show what would happen without moving anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Revert the most recent organize run
    Undo,
    /// List recorded organize runs
    History,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let ctx = CliContext {
        config_path: cli.config,
        history_path: cli.history,
        show_progress: !cli.quiet,
    };

    let command = match cli.command {
        Some(Commands::Organize {
            source,
            dest,
            by,
            dry_run,
        }) => {
            let mut request = OrganizeRequest::new(source, by);
            request.destination = dest;
            Command::Organize { request, dry_run }
        }
        Some(Commands::Undo) => Command::Undo,
        Some(Commands::History) => Command::History,
        None => return interactive(&ctx),
    };

    match run_cli(command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

fn interactive(ctx: &CliContext) -> ExitCode {
    let mut orchestrator = match ctx.open() {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            return ExitCode::from(e.exit_code());
        }
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    match run_menu(&mut orchestrator, &mut input, &mut output, ctx.show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Input error: {}", e));
            ExitCode::FAILURE
        }
    }
}
