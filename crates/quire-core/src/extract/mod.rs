//! Metadata extraction contract
//!
//! The store never interprets document content itself. Every save hands the
//! content to a [`MetadataExtractor`] and persists the projections it returns.

mod markdown;

pub use markdown::MarkdownExtractor;

use crate::error::Result;

/// Projections of a document that the store indexes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: String,
    pub plain_text: String,
    pub tags: Vec<String>,
    /// Target note ids, in document order
    pub outgoing_links: Vec<String>,
}

/// Reduces a stored document to its indexable metadata.
///
/// An `Err` fails the whole save; implementations must not return empty
/// projections to signal a failure.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, content: &str) -> Result<ExtractedMetadata>;

    /// Convert stored content back into the editor's document form
    fn render(&self, stored: &str) -> String {
        stored.to_string()
    }
}
