//! CLI argument parsing for quire
//!
//! Global flags: --store, --format, --quiet, --verbose, --log-level, --log-json

pub mod journal;
pub mod output;
pub mod parse;
pub mod table;
pub mod version;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use journal::JournalCommands;
pub use output::OutputFormat;
pub use table::TableCommands;
pub use version::VersionCommands;

/// Quire - local knowledge store
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store directory (defaults to the per-user data directory)
    #[arg(long, global = true, env = "QUIRE_STORE")]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug logging and phase timings
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (e.g. `debug`, `quire_core=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store and write a default quire.toml
    Init,

    /// Save a note, reading its content from --file or stdin
    Save {
        /// Note ID
        id: String,

        /// Explicit title (extracted from the content when omitted)
        #[arg(long, short)]
        title: Option<String>,

        /// Storage path (kept for existing notes, derived from the title otherwise)
        #[arg(long, short)]
        path: Option<String>,

        /// Read content from this file instead of stdin
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Show a note
    Show {
        /// Note ID or storage path
        id_or_path: String,
    },

    /// Delete a note with its tags, outgoing links and versions
    Delete {
        /// Note ID
        id: String,
    },

    /// Move a note to a new storage path
    Rename {
        /// Current storage path
        old_path: String,

        /// New storage path
        new_path: String,
    },

    /// Most recently updated notes
    Recent {
        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List tags in use with their note counts
    Tags,

    /// Notes carrying a tag
    Tagged {
        /// Tag name
        tag: String,
    },

    /// Full-text search over titles and bodies
    Search {
        /// Search query
        query: String,

        #[arg(long, default_value = "20")]
        limit: usize,

        /// Include a highlighted excerpt for each hit
        #[arg(long)]
        snippets: bool,
    },

    /// Notes linking to a note
    Backlinks {
        /// Note ID
        id: String,
    },

    /// Dump the note graph
    Graph,

    /// Journal entries
    #[command(subcommand)]
    Journal(JournalCommands),

    /// Mini-tables
    #[command(subcommand)]
    Table(TableCommands),

    /// Note version history
    #[command(subcommand)]
    Version(VersionCommands),

    /// Check store integrity
    Doctor {
        /// Back up the store and repair what can be repaired
        #[arg(long)]
        repair: bool,
    },

    /// Refresh the full-text index
    Index {
        /// Rebuild while holding the store exclusively
        #[arg(long)]
        rebuild: bool,
    },

    /// Row counts and schema version
    Stats,
}
