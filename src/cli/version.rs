//! Version history subcommands

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum VersionCommands {
    /// Snapshot a note's current content
    Save {
        /// Note ID
        note: String,

        /// Write even if the minimum interval has not elapsed
        #[arg(long)]
        force: bool,
    },

    /// Snapshots of a note, newest first
    List {
        /// Note ID
        note: String,

        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Print a snapshot's content
    Show {
        /// Version ID
        id: String,
    },

    /// Line diff between two snapshots
    Diff {
        /// Older version ID
        from: String,

        /// Newer version ID
        to: String,
    },

    /// Delete one snapshot, or every snapshot of a note with --all
    Delete {
        /// Version ID, or note ID with --all
        id: String,

        #[arg(long)]
        all: bool,
    },

    /// Write a snapshot back into its note, checkpointing the current content first
    Restore {
        /// Version ID
        id: String,
    },
}
