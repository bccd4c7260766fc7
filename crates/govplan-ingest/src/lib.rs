//! Govplan Ingest
//!
//! Turns a converted governance document into addressable sections and
//! per-section facts.
//!
//! # Architecture
//!
//! ```text
//! raw text → Document::parse → SectionSplitter → Section[] → SectionSummarizer → SectionSummary[]
//!                                                                 ↑___________↓
//!                                                             SummaryStore (content-addressed)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use govplan_ingest::{Document, SectionSummarizer};
//!
//! let doc = Document::parse(raw)?;
//! let sections = doc.sections();
//! let summaries = SectionSummarizer::default().summarize_all(&sections);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod splitter;
pub mod summarizer;

pub use cache::{MemorySummaryStore, MokaSummaryStore, SummaryStore};
pub use config::SummarizerConfig;
pub use document::Document;
pub use error::{IngestError, IngestResult};
pub use splitter::{split_sections, SectionSplitter, INTRODUCTION_TITLE};
pub use summarizer::{SectionSummarizer, SummarizerStats};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
