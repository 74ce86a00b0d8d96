//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite busy timeout applied to every connection
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Rebuild the text index on open when its row count disagrees with the note count
    #[serde(default = "default_true")]
    pub auto_rebuild_index: bool,

    /// Directory for safety backups taken before repair (defaults to `<db dir>/backups`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Version snapshot policy
    #[serde(default)]
    pub versions: VersionPolicy,

    /// Write coordinator timings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Tag normalization policy
    #[serde(default)]
    pub tags: TagPolicy,

    /// Journal note layout
    #[serde(default)]
    pub journal: JournalConfig,

    /// Default metadata extractor settings
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Rate limiting and retention for version snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionPolicy {
    /// Minimum age of the latest snapshot before a periodic one is written
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Retention bound per note
    #[serde(default = "default_max_per_note")]
    pub max_per_note: usize,

    /// The most recent N snapshots are never pruned
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Forced snapshots younger than this survive pruning
    #[serde(default = "default_forced_retention_days")]
    pub forced_retention_days: u64,
}

/// Debounce timings for the write coordinator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinatorConfig {
    /// Inactivity delay before a scheduled persist runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay before a pending request queued behind an in-flight persist runs
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// How extracted tag names are normalized before they are stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagPolicy {
    /// When false, tag names are lowercased
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Strip surrounding whitespace
    #[serde(default = "default_true")]
    pub trim: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalConfig {
    /// Directory prefix of journal note paths
    #[serde(default = "default_journal_prefix")]
    pub path_prefix: String,

    /// chrono format string for journal titles
    #[serde(default = "default_journal_title_format")]
    pub title_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractorConfig {
    /// Title used when a document has no heading or text
    #[serde(default = "default_title_fallback")]
    pub title_fallback: String,

    /// Extracted titles are cut to this many characters
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_min_interval_secs() -> u64 {
    300
}

fn default_max_per_note() -> usize {
    100
}

fn default_keep_recent() -> usize {
    20
}

fn default_forced_retention_days() -> u64 {
    7
}

fn default_debounce_ms() -> u64 {
    750
}

fn default_retry_delay_ms() -> u64 {
    50
}

fn default_journal_prefix() -> String {
    "journals".to_string()
}

fn default_journal_title_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_title_fallback() -> String {
    "Untitled".to_string()
}

fn default_max_title_len() -> usize {
    120
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            busy_timeout_ms: default_busy_timeout_ms(),
            auto_rebuild_index: true,
            backup_dir: None,
            versions: VersionPolicy::default(),
            coordinator: CoordinatorConfig::default(),
            tags: TagPolicy::default(),
            journal: JournalConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl Default for VersionPolicy {
    fn default() -> Self {
        VersionPolicy {
            min_interval_secs: default_min_interval_secs(),
            max_per_note: default_max_per_note(),
            keep_recent: default_keep_recent(),
            forced_retention_days: default_forced_retention_days(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            debounce_ms: default_debounce_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for TagPolicy {
    fn default() -> Self {
        TagPolicy {
            case_sensitive: true,
            trim: true,
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            path_prefix: default_journal_prefix(),
            title_format: default_journal_title_format(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            title_fallback: default_title_fallback(),
            max_title_len: default_max_title_len(),
        }
    }
}
