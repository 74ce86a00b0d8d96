//! Journal subcommands

use super::parse::parse_date;
use chrono::NaiveDate;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum JournalCommands {
    /// Create the journal for a date (today by default); no-op if it exists
    Create {
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Journals, newest date first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Print whether a journal exists for a date
    Exists {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// Delete the journal of a date
    Delete {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
}
