//! Structured fact extraction per section
//!
//! All rules are deterministic regex/structure heuristics:
//!
//! | Fact        | Source                                                           |
//! |-------------|------------------------------------------------------------------|
//! | obligations | list items (≥ `min_item_len` chars or modal), modal sentences    |
//! | outcomes    | sentences with ensure / result in / achieve / maintain / remain  |
//! | actors      | configured role vocabulary                                       |
//! | constraints | phrase after in accordance with / per / pursuant to / ...        |
//! | references  | section numbers, standards, URLs                                 |
//!
//! Results are memoized in an injected [`SummaryStore`] keyed by
//! `hash(section_id, content)`.

use crate::cache::{MokaSummaryStore, SummaryStore};
use crate::config::SummarizerConfig;
use govplan_artifact::{ContentHash, Section, SectionSummary};
use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static MODAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:must|shall|will|should)\b").expect("valid regex"));

static OUTCOME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ensures?|results?\s+in|achieves?|maintains?|remains?)\b")
        .expect("valid regex")
});

static CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:in\s+accordance\s+with|pursuant\s+to|compl(?:y|ies)\s+with|subject\s+to|per)\s+([^.;:,\n]+)",
    )
    .expect("valid regex")
});

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bsection\s+\d+(?:\.\d+)*|§\s*\d+(?:\.\d+)*|\bNIST\s+(?:SP\s+)?\d+(?:-\d+)*[A-Z]?\b|\bISO(?:/IEC)?\s+\d+(?::\d{4})?|\bFIPS\s+\d+(?:-\d+)?|https?://[^\s)>\]]+",
    )
    .expect("valid regex")
});

/// Cache hit / miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummarizerStats {
    /// Summaries served from the store
    pub hits: u64,
    /// Summaries computed
    pub misses: u64,
    /// Entries currently in the store
    pub entry_count: u64,
}

/// Section fact extractor with injected memoization
#[derive(Debug)]
pub struct SectionSummarizer {
    config: SummarizerConfig,
    store: Arc<dyn SummaryStore>,
    actors: Vec<(String, Regex)>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SectionSummarizer {
    /// Create summarizer over an injected store
    #[must_use]
    pub fn new(config: SummarizerConfig, store: Arc<dyn SummaryStore>) -> Self {
        let actors = config
            .actor_vocabulary
            .iter()
            .filter_map(|term| {
                let term = term.trim().to_lowercase();
                match actor_regex(&term) {
                    Ok(re) => Some((term, re)),
                    Err(e) => {
                        tracing::warn!(%term, error = %e, "skipping actor term");
                        None
                    }
                }
            })
            .collect();

        Self {
            config,
            store,
            actors,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create summarizer with a bounded moka store sized from the config
    #[must_use]
    pub fn with_default_store(config: SummarizerConfig) -> Self {
        let store = Arc::new(MokaSummaryStore::new(config.cache_capacity));
        Self::new(config, store)
    }

    /// Summarize one section, consulting the store first
    ///
    /// A store hit returns a value-equal summary with `cached = true`.
    pub fn run(&self, section_id: &str, title: &str, content: &str) -> SectionSummary {
        let key = ContentHash::compute_parts(&[section_id, content]);

        if let Some(mut hit) = self.store.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(section_id, "summary cache hit");
            hit.cached = true;
            return hit;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let summary = self.extract(section_id, title, content);
        self.store.insert(key, summary.clone());
        summary
    }

    /// Summarize a section
    #[inline]
    pub fn summarize(&self, section: &Section) -> SectionSummary {
        self.run(&section.id, &section.title, &section.content)
    }

    /// Summarize many sections in parallel, preserving order
    pub fn summarize_all(&self, sections: &[Section]) -> Vec<SectionSummary> {
        let summaries: Vec<SectionSummary> =
            sections.par_iter().map(|s| self.summarize(s)).collect();
        let empty = summaries.iter().filter(|s| !s.has_signal()).count();
        tracing::debug!(sections = sections.len(), without_signal = empty, "summarized sections");
        summaries
    }

    /// Cache statistics
    #[must_use]
    pub fn stats(&self) -> SummarizerStats {
        SummarizerStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.store.entry_count(),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    fn extract(&self, section_id: &str, title: &str, content: &str) -> SectionSummary {
        let blocks = TextBlocks::collect(content);
        let cfg = &self.config;

        let mut obligations = Facts::new(cfg.max_obligations);
        for item in &blocks.items {
            if item.chars().count() >= cfg.min_item_len || MODAL.is_match(item) {
                obligations.push(item);
            }
        }
        for sentence in blocks.prose.iter().flat_map(|p| sentences(p)) {
            if MODAL.is_match(sentence) {
                obligations.push(sentence);
            }
        }

        let mut outcomes = Facts::new(cfg.max_outcomes);
        for sentence in blocks.all().flat_map(sentences) {
            if OUTCOME.is_match(sentence) {
                outcomes.push(sentence);
            }
        }

        let plain = blocks.all().collect::<Vec<_>>().join(" ");

        let mut actors = Facts::new(cfg.max_actors);
        let mut found: Vec<(usize, &str)> = self
            .actors
            .iter()
            .filter_map(|(term, re)| re.find(&plain).map(|m| (m.start(), term.as_str())))
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        for (_, term) in found {
            actors.push(term);
        }

        let mut constraints = Facts::new(cfg.max_constraints);
        for caps in CONSTRAINT.captures_iter(&plain) {
            if let Some(phrase) = caps.get(1) {
                constraints.push(phrase.as_str());
            }
        }

        let mut references = Facts::new(cfg.max_references);
        for m in REFERENCE.find_iter(content) {
            references.push(m.as_str());
        }

        SectionSummary {
            section_id: section_id.to_string(),
            title: title.to_string(),
            obligations: obligations.into_vec(),
            outcomes: outcomes.into_vec(),
            actors: actors.into_vec(),
            constraints: constraints.into_vec(),
            references: references.into_vec(),
            cached: false,
        }
    }
}

impl Default for SectionSummarizer {
    fn default() -> Self {
        Self::with_default_store(SummarizerConfig::default())
    }
}

/// Word-bounded regex for an actor term and its plural
fn actor_regex(term: &str) -> Result<Regex, regex::Error> {
    let plural = match term.strip_suffix('y') {
        Some(stem) => format!("{}ies", regex::escape(stem)),
        None => format!("{}s", regex::escape(term)),
    };
    Regex::new(&format!(r"(?i)\b(?:{}|{})\b", regex::escape(term), plural))
}

/// Ordered, case-insensitively deduplicated, capped list
struct Facts {
    cap: usize,
    seen: HashSet<String>,
    items: Vec<String>,
}

impl Facts {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        if self.items.len() >= self.cap {
            return;
        }
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return;
        }
        if self.seen.insert(text.to_lowercase()) {
            self.items.push(text);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// Plain text of a section split into list items and prose blocks
#[derive(Debug, Default)]
struct TextBlocks {
    items: Vec<String>,
    prose: Vec<String>,
}

impl TextBlocks {
    fn collect(content: &str) -> Self {
        let mut blocks = Self::default();
        let mut item_stack: Vec<String> = Vec::new();
        let mut paragraph = String::new();
        let mut in_code = false;

        for event in Parser::new(content) {
            match event {
                Event::Start(Tag::CodeBlock(_)) => in_code = true,
                Event::End(TagEnd::CodeBlock) => in_code = false,
                Event::Start(Tag::Item) => item_stack.push(String::new()),
                Event::End(TagEnd::Item) => {
                    if let Some(text) = item_stack.pop() {
                        let text = collapse_whitespace(&text);
                        if !text.is_empty() {
                            blocks.items.push(text);
                        }
                    }
                }
                Event::Text(text) | Event::Code(text) if !in_code => {
                    let target = item_stack.last_mut().unwrap_or(&mut paragraph);
                    target.push_str(&text);
                }
                Event::SoftBreak | Event::HardBreak => {
                    let target = item_stack.last_mut().unwrap_or(&mut paragraph);
                    target.push(' ');
                }
                Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::TableCell) => {
                    if let Some(top) = item_stack.last_mut() {
                        top.push(' ');
                    } else {
                        blocks.flush_prose(&mut paragraph);
                    }
                }
                _ => {}
            }
        }
        blocks.flush_prose(&mut paragraph);
        blocks
    }

    fn flush_prose(&mut self, paragraph: &mut String) {
        let text = collapse_whitespace(paragraph);
        if !text.is_empty() {
            self.prose.push(text);
        }
        paragraph.clear();
    }

    fn all(&self) -> impl Iterator<Item = &str> {
        self.items.iter().chain(self.prose.iter()).map(String::as_str)
    }
}

/// Split text on `.`, `!` or `?` followed by whitespace or end of text
///
/// Decimal numbers such as `4.2` stay inside one sentence.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = idx + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
