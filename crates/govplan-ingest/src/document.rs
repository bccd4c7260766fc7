//! Document envelope: YAML front matter plus markdown body
//!
//! The external converter emits markdown preceded by a front-matter block:
//!
//! ```text
//! ---
//! document_id: access-policy-2024
//! filename: access-policy.pdf
//! source_path: uploads/access-policy.pdf
//! markdown_path: converted/access-policy.md
//! ---
//! ## Purpose
//! ...
//! ```

use crate::error::{IngestError, IngestResult};
use crate::splitter::SectionSplitter;
use govplan_artifact::{DocumentMeta, Section};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FrontMatter {
    document_id: String,
    filename: Option<String>,
    source_path: Option<String>,
    markdown_path: Option<String>,
    title: Option<String>,
}

/// Parsed document ready for splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document metadata
    pub meta: DocumentMeta,
    /// Markdown body without front matter
    pub body: String,
    /// Number of lines consumed by the front-matter block
    pub body_line_offset: usize,
}

impl Document {
    /// Build a document from caller-supplied metadata
    #[must_use]
    pub fn from_parts(meta: DocumentMeta, body: impl Into<String>) -> Self {
        Self {
            meta,
            body: body.into(),
            body_line_offset: 0,
        }
    }

    /// Parse a raw document with a leading `---` front-matter block
    ///
    /// # Errors
    /// - `IngestError::MissingFrontMatter` if the first line is not `---`
    /// - `IngestError::UnterminatedFrontMatter` if no closing delimiter exists
    /// - `IngestError::InvalidFrontMatter` if the YAML is malformed or lacks `document_id`
    /// - `IngestError::EmptyField` if `document_id` is blank
    pub fn parse(raw: &str) -> IngestResult<Self> {
        let mut lines = raw.lines();
        match lines.next() {
            Some(first) if first.trim_end() == "---" => {}
            _ => return Err(IngestError::MissingFrontMatter),
        }

        let mut yaml = Vec::new();
        let mut closed = false;
        for line in lines.by_ref() {
            let trimmed = line.trim_end();
            if trimmed == "---" || trimmed == "..." {
                closed = true;
                break;
            }
            yaml.push(line);
        }
        if !closed {
            return Err(IngestError::UnterminatedFrontMatter);
        }

        let front: FrontMatter = serde_yaml::from_str(&yaml.join("\n"))?;
        let document_id = front.document_id.trim().to_string();
        if document_id.is_empty() {
            return Err(IngestError::EmptyField("document_id"));
        }

        let mut meta = DocumentMeta::new(document_id);
        if let Some(filename) = front.filename {
            meta = meta.with_filename(filename);
        }
        if let Some(path) = front.source_path {
            meta = meta.with_source_path(path);
        }
        if let Some(path) = front.markdown_path {
            meta = meta.with_markdown_path(path);
        }
        if let Some(title) = front.title {
            meta = meta.with_title(title);
        }

        let body_line_offset = yaml.len() + 2;
        let body = lines.collect::<Vec<_>>().join("\n");
        tracing::debug!(document_id = %meta.document_id, body_line_offset, "parsed front matter");

        Ok(Self {
            meta,
            body,
            body_line_offset,
        })
    }

    /// Document id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.document_id
    }

    /// Split the body into sections, line numbers relative to the raw file
    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        SectionSplitter::new()
            .with_source_path(self.meta.source_path.clone())
            .with_line_offset(self.body_line_offset)
            .split(&self.body, &self.meta.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "---\ndocument_id: access-policy-2024\nfilename: access-policy.pdf\nmarkdown_path: converted/access-policy.md\n---\n## Purpose\nThe agency must protect data.\n";

    #[test]
    fn parses_front_matter_and_body() {
        let doc = Document::parse(RAW).unwrap();
        assert_eq!(doc.id(), "access-policy-2024");
        assert_eq!(doc.meta.filename, "access-policy.pdf");
        assert_eq!(doc.meta.markdown_path, "converted/access-policy.md");
        assert_eq!(doc.meta.source_path, "access-policy-2024.md");
        assert_eq!(doc.body_line_offset, 5);
        assert!(doc.body.starts_with("## Purpose"));
    }

    #[test]
    fn section_lines_refer_to_raw_file() {
        let doc = Document::parse(RAW).unwrap();
        let sections = doc.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].start_line, 6);
        assert_eq!(sections[0].end_line, 7);
        assert_eq!(RAW.lines().nth(5), Some("## Purpose"));
    }

    #[test]
    fn missing_front_matter() {
        let err = Document::parse("## Purpose\nbody").unwrap_err();
        assert!(matches!(err, IngestError::MissingFrontMatter));
    }

    #[test]
    fn unterminated_front_matter() {
        let err = Document::parse("---\ndocument_id: x\n## Purpose").unwrap_err();
        assert!(matches!(err, IngestError::UnterminatedFrontMatter));
    }

    #[test]
    fn missing_document_id() {
        let err = Document::parse("---\nfilename: a.pdf\n---\nbody").unwrap_err();
        assert!(matches!(err, IngestError::InvalidFrontMatter(_)));

        let err = Document::parse("---\ndocument_id: '  '\n---\nbody").unwrap_err();
        assert!(matches!(err, IngestError::EmptyField("document_id")));
    }

    #[test]
    fn from_parts_has_no_offset() {
        let doc = Document::from_parts(DocumentMeta::new("d"), "## A\nbody");
        assert_eq!(doc.body_line_offset, 0);
        assert_eq!(doc.sections()[0].start_line, 1);
    }
}
