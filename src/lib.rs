//! foldersort - sort a directory's files into category or date folders
//!
//! Files are classified by extension (or by creation date), moved into a
//! matching subfolder, and every move is recorded in a persistent history log
//! so the most recent run can be undone.

pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod history;
pub mod logging;
pub mod menu;
pub mod namer;
pub mod orchestrator;
pub mod output;
pub mod undo;

pub use cli::{CliContext, Command, run_cli};
pub use config::{CompiledFilters, Config, ConfigError};
pub use error::{MetadataError, OrganizeError, OrganizeResult};
pub use file_category::{Category, FileMapper, classify};
pub use file_organizer::FileOrganizer;
pub use history::{Batch, HistoryStore, JsonlHistory, MemoryHistory, MoveRecord};
pub use namer::{FileEntry, OrganizeMode, folder_name};
pub use orchestrator::{OrganizeRequest, Orchestrator};
pub use undo::{UndoManager, UndoOutcome, UndoReport};
