use clap::ValueEnum;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Human,
    /// Pretty-printed JSON on stdout, JSON error envelopes on stderr
    Json,
}
