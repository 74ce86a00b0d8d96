use super::{ExtractedMetadata, MetadataExtractor};
use crate::config::ExtractorConfig;
use crate::error::{QuireError, Result};
use regex::Regex;
use std::collections::HashSet;

/// Default extractor for markdown documents.
///
/// Tags are `#tag` tokens, links are `[[note-id]]` or `[[note-id|label]]`.
/// Fenced code blocks contribute text but never tags or links.
#[derive(Debug, Clone)]
pub struct MarkdownExtractor {
    config: ExtractorConfig,
    tag_re: Regex,
    wiki_link_re: Regex,
    md_link_re: Regex,
    heading_re: Regex,
    list_marker_re: Regex,
}

impl MarkdownExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                QuireError::ExtractionFailure(format!("invalid pattern {}: {}", pattern, e))
            })
        };

        Ok(MarkdownExtractor {
            config,
            tag_re: compile(r"(?:^|\s)#([\p{L}\p{N}_][\p{L}\p{N}_/-]*)")?,
            wiki_link_re: compile(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]")?,
            md_link_re: compile(r"!?\[([^\]]*)\]\(([^)]+)\)")?,
            heading_re: compile(r"^\s{0,3}#{1,6}\s+")?,
            list_marker_re: compile(r"^\s*(?:[-*+]|\d+[.)])\s+(?:\[[ xX]\]\s+)?")?,
        })
    }

    fn strip_inline(&self, line: &str) -> String {
        let line = self.wiki_link_re.replace_all(line, |caps: &regex::Captures| {
            caps.get(2)
                .or_else(|| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        });
        let line = self.md_link_re.replace_all(&line, "$1");
        line.replace("**", "")
            .replace("__", "")
            .replace("~~", "")
            .replace('`', "")
    }

    fn strip_block(&self, line: &str) -> String {
        let line = self.heading_re.replace(line, "");
        let line = line.trim_start().trim_start_matches('>').trim_start();
        self.list_marker_re.replace(line, "").to_string()
    }

    fn truncate_title(&self, title: &str) -> String {
        let title = title.trim();
        if title.chars().count() <= self.config.max_title_len {
            title.to_string()
        } else {
            title.chars().take(self.config.max_title_len).collect()
        }
    }
}

impl MetadataExtractor for MarkdownExtractor {
    fn extract(&self, content: &str) -> Result<ExtractedMetadata> {
        let mut title: Option<String> = None;
        let mut first_text: Option<String> = None;
        let mut plain_lines = Vec::new();
        let mut tags = Vec::new();
        let mut seen_tags = HashSet::new();
        let mut links = Vec::new();
        let mut seen_links = HashSet::new();
        let mut in_fence = false;

        for raw in content.lines() {
            if raw.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }

            if !in_fence {
                if title.is_none() && self.heading_re.is_match(raw) {
                    title = Some(self.strip_inline(&self.strip_block(raw)));
                }

                for caps in self.tag_re.captures_iter(raw) {
                    let tag = caps[1].trim_end_matches(['/', '-']).to_string();
                    if !tag.is_empty() && seen_tags.insert(tag.clone()) {
                        tags.push(tag);
                    }
                }

                for caps in self.wiki_link_re.captures_iter(raw) {
                    let target = caps[1].trim().to_string();
                    if !target.is_empty() && seen_links.insert(target.clone()) {
                        links.push(target);
                    }
                }
            }

            let text = if in_fence {
                raw.to_string()
            } else {
                self.strip_inline(&self.strip_block(raw))
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if first_text.is_none() {
                first_text = Some(text.to_string());
            }
            plain_lines.push(text.to_string());
        }

        let title = title
            .filter(|t| !t.trim().is_empty())
            .or(first_text)
            .map(|t| self.truncate_title(&t))
            .unwrap_or_else(|| self.config.title_fallback.clone());

        Ok(ExtractedMetadata {
            title,
            plain_text: plain_lines.join("\n"),
            tags,
            outgoing_links: links,
        })
    }
}
