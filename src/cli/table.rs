//! Mini-table subcommands

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum TableCommands {
    /// Create a table holding only the title property
    Create {
        /// Table title
        title: String,

        /// Note that embeds the table
        #[arg(long)]
        note: Option<String>,
    },

    /// List tables, optionally only those embedded in a note
    List {
        #[arg(long)]
        note: Option<String>,
    },

    /// Show a table's properties and rows as its selected view displays them
    Show {
        /// Table ID
        id: String,

        /// Ignore the view's filters and sorts
        #[arg(long)]
        all: bool,
    },

    /// Append a row
    AddRow {
        /// Table ID
        id: String,

        /// Value of the title property
        #[arg(long, short)]
        title: Option<String>,

        /// Further values as a JSON object of property id to typed value,
        /// e.g. '{"points": {"type": "number", "value": 3}}'
        #[arg(long)]
        values: Option<String>,
    },

    /// Copy a table and its rows under new ids
    Duplicate {
        /// Table ID
        id: String,
    },

    /// Delete a table and its rows
    Delete {
        /// Table ID
        id: String,
    },
}
