//! Deterministic section splitting
//!
//! Partitions a markdown body into ordered [`Section`]s on `##`-or-deeper
//! headings. Pure function of the input text: splitting the same body twice
//! yields identical ids, content and line ranges.

use govplan_artifact::{ids, Section};

/// Title given to content that precedes the first heading
pub const INTRODUCTION_TITLE: &str = "Introduction";

/// Title given to a heading line with no text
pub const UNTITLED_TITLE: &str = "Untitled section";

/// Line-oriented markdown splitter
#[derive(Debug, Clone, Default)]
pub struct SectionSplitter {
    source_path: String,
    line_offset: usize,
}

impl SectionSplitter {
    /// Create new splitter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With source path recorded on every section
    #[inline]
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Shift reported line numbers by `offset` lines
    ///
    /// Used when the body was preceded by a stripped front-matter block.
    #[inline]
    #[must_use]
    pub fn with_line_offset(mut self, offset: usize) -> Self {
        self.line_offset = offset;
        self
    }

    /// Split markdown into sections
    ///
    /// Blank or empty input yields no sections.
    #[must_use]
    pub fn split(&self, markdown: &str, document_id: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut current = PendingSection::new(INTRODUCTION_TITLE.to_string(), 1);
        let mut fence: Option<&str> = None;
        let mut last_line = 0;

        for (idx, line) in markdown.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            let trimmed = line.trim_start();

            if let Some(marker) = fence {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
                current.lines.push(line);
                continue;
            }

            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                fence = Some(&trimmed[..3]);
                current.lines.push(line);
                continue;
            }

            if let Some(title) = heading_text(line) {
                let next = PendingSection::new(title, line_no);
                let finished = std::mem::replace(&mut current, next);
                self.flush(finished, line_no - 1, document_id, &mut sections);
                continue;
            }

            current.lines.push(line);
        }

        self.flush(current, last_line, document_id, &mut sections);
        tracing::debug!(document_id, count = sections.len(), "split document into sections");
        sections
    }

    fn flush(
        &self,
        pending: PendingSection<'_>,
        end_line: usize,
        document_id: &str,
        sections: &mut Vec<Section>,
    ) {
        if !pending.has_content() {
            return;
        }
        let content = pending.lines.join("\n").trim().to_string();
        let seq = sections.len() + 1;
        sections.push(Section {
            id: ids::section_id(document_id, seq, &pending.title, &content),
            title: pending.title,
            content,
            source_path: self.source_path.clone(),
            start_line: pending.start_line + self.line_offset,
            end_line: end_line + self.line_offset,
        });
    }
}

/// Split with default settings
#[must_use]
pub fn split_sections(markdown: &str, document_id: &str) -> Vec<Section> {
    SectionSplitter::new().split(markdown, document_id)
}

#[derive(Debug)]
struct PendingSection<'a> {
    title: String,
    start_line: usize,
    lines: Vec<&'a str>,
}

impl<'a> PendingSection<'a> {
    fn new(title: String, start_line: usize) -> Self {
        Self {
            title,
            start_line,
            lines: Vec::new(),
        }
    }

    fn has_content(&self) -> bool {
        self.lines.iter().any(|l| !l.trim().is_empty())
    }
}

/// Heading text when `line` is a `##`-or-deeper ATX heading
fn heading_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes < 2 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = strip_closing_sequence(rest.trim());
    if text.is_empty() {
        Some(UNTITLED_TITLE.to_string())
    } else {
        Some(text.to_string())
    }
}

/// Drop an optional closing `#` run; it only counts when preceded by
/// whitespace or when it is all that remains
fn strip_closing_sequence(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        text
    } else if without.is_empty() || without.ends_with(char::is_whitespace) {
        without.trim_end()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const DOC: &str = "Preamble text.\n\n## Scope\nApplies to all staff.\n\n## Requirements\n- Rotate keys\n- Review access\n";

    #[test]
    fn splits_on_headings_with_introduction() {
        let sections = split_sections(DOC, "policy-1");
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Introduction", "Scope", "Requirements"]);
        assert_eq!(sections[0].content, "Preamble text.");
        assert_eq!((sections[0].start_line, sections[0].end_line), (1, 2));
        assert_eq!((sections[1].start_line, sections[1].end_line), (3, 5));
        assert_eq!((sections[2].start_line, sections[2].end_line), (6, 8));
        assert_eq!(sections[2].content, "- Rotate keys\n- Review access");
    }

    #[test]
    fn ids_have_expected_shape() {
        let sections = split_sections(DOC, "policy-1");
        assert!(sections[0].id.starts_with("sec-policy1-01-"));
        assert!(sections[2].id.starts_with("sec-policy1-03-"));
    }

    #[test]
    fn empty_document_yields_no_sections() {
        assert!(split_sections("", "d").is_empty());
        assert!(split_sections("\n   \n\n", "d").is_empty());
    }

    #[test]
    fn heading_without_content_is_dropped() {
        let sections = split_sections("## Empty\n## Filled\nbody\n", "d");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Filled");
        assert!(sections[0].id.starts_with("sec-d-01-"));
    }

    #[test]
    fn single_hash_heading_is_content() {
        let sections = split_sections("# Title\nbody\n", "d");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, INTRODUCTION_TITLE);
        assert!(sections[0].content.starts_with("# Title"));
    }

    #[test]
    fn headings_inside_fences_are_content() {
        let doc = "## Config\n```\n## not a heading\n```\nafter\n";
        let sections = split_sections(doc, "d");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.contains("## not a heading"));
    }

    #[test]
    fn colliding_titles_get_distinct_ids() {
        let doc = "## Scope\nfirst\n## Scope\nsecond\n## Scope\nfirst\n";
        let sections = split_sections(doc, "d");
        assert_eq!(sections.len(), 3);
        assert_ne!(sections[0].id, sections[1].id);
        assert_ne!(sections[0].id, sections[2].id);
        // same title and content differ only by sequence number
        assert_eq!(sections[0].id[sections[0].id.len() - 8..], sections[2].id[sections[2].id.len() - 8..]);
    }

    #[test]
    fn closing_hashes_and_offsets() {
        let sections = SectionSplitter::new()
            .with_source_path("docs/p.md")
            .with_line_offset(4)
            .split("### Access ###\nbody", "d");
        assert_eq!(sections[0].title, "Access");
        assert_eq!(sections[0].source_path, "docs/p.md");
        assert_eq!((sections[0].start_line, sections[0].end_line), (5, 6));
    }

    #[test]
    fn hash_without_space_is_not_heading() {
        assert_eq!(heading_text("##Scope"), None);
        assert_eq!(heading_text("    ## indented code"), None);
        assert_eq!(heading_text("##"), Some(UNTITLED_TITLE.to_string()));
    }

    #[test]
    fn trailing_hash_inside_title_is_kept() {
        assert_eq!(heading_text("## C#"), Some("C#".to_string()));
        assert_eq!(heading_text("## C# ##"), Some("C#".to_string()));
        assert_eq!(heading_text("## Issue \\#"), Some("Issue \\#".to_string()));
        assert_eq!(heading_text("## ###"), Some(UNTITLED_TITLE.to_string()));
    }

    proptest! {
        #[test]
        fn prop_split_is_idempotent(lines in proptest::collection::vec("(## )?[a-z ]{0,12}", 0..30)) {
            let doc = lines.join("\n");
            let first = split_sections(&doc, "doc-x");
            let second = split_sections(&doc, "doc-x");
            prop_assert_eq!(&first, &second);
        }

        #[test]
        fn prop_ids_unique_and_ranges_ordered(lines in proptest::collection::vec("(## )?[a-c]{0,3}", 0..40)) {
            let doc = lines.join("\n");
            let sections = split_sections(&doc, "doc-x");
            let mut ids: Vec<_> = sections.iter().map(|s| s.id.clone()).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), sections.len());
            for pair in sections.windows(2) {
                prop_assert!(pair[0].end_line < pair[1].start_line);
            }
            for s in &sections {
                prop_assert!(s.start_line <= s.end_line);
            }
        }
    }
}
