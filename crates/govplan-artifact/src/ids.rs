//! Deterministic identifier construction
//!
//! Every artifact id in the hierarchy is derived from its parent's id, so the
//! ids themselves encode traceability:
//!
//! ```text
//! sec-<doc8>-<seq2>-<hash8>
//! epic-<doc8>[-NN]
//! <project>-<epic_id>-feature-NN[-subfeature-MM]
//! <project>-<feature_id>-story-NN-<slug>
//! ```

use crate::hash::ContentHash;

/// Length of the document prefix embedded in section and epic ids
pub const DOCUMENT_PREFIX_LEN: usize = 8;

/// Length of the content hash suffix in section ids
pub const SECTION_HASH_LEN: usize = 8;

/// Maximum number of words kept in a story slug
pub const STORY_SLUG_WORDS: usize = 5;

/// Lower-cased alphanumeric prefix of a document id
///
/// Falls back to `doc` when the id has no alphanumeric characters.
#[must_use]
pub fn document_prefix(document_id: &str) -> String {
    let prefix: String = document_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(DOCUMENT_PREFIX_LEN)
        .collect();
    if prefix.is_empty() {
        "doc".to_string()
    } else {
        prefix
    }
}

/// Section id: `sec-<doc8>-<seq2>-<hash8>`
///
/// `seq` is 1-based. The hash covers title and content so sections with
/// colliding titles still get distinct ids.
#[must_use]
pub fn section_id(document_id: &str, seq: usize, title: &str, content: &str) -> String {
    let hash = ContentHash::compute_parts(&[title, content]);
    format!(
        "sec-{}-{:02}-{}",
        document_prefix(document_id),
        seq,
        hash.hex_prefix(SECTION_HASH_LEN)
    )
}

/// Epic id for the `index`-th (0-based) of `total` epics
///
/// A document that yields a single epic gets the bare `epic-<doc8>` form.
#[must_use]
pub fn epic_id(document_id: &str, index: usize, total: usize) -> String {
    let prefix = document_prefix(document_id);
    if total <= 1 {
        format!("epic-{prefix}")
    } else {
        format!("epic-{prefix}-{:02}", index + 1)
    }
}

/// Top-level feature id, `n` is 1-based
#[must_use]
pub fn feature_id(project: &str, epic_id: &str, n: usize) -> String {
    format!("{}-{epic_id}-feature-{n:02}", project_slug(project))
}

/// Sub-feature id, `m` is 1-based
#[must_use]
pub fn subfeature_id(parent_feature_id: &str, m: usize) -> String {
    format!("{parent_feature_id}-subfeature-{m:02}")
}

/// Story id, `n` is 1-based
///
/// The project prefix is not repeated when the feature id already carries it.
#[must_use]
pub fn story_id(project: &str, feature_id: &str, n: usize, short_name: &str) -> String {
    let project = project_slug(project);
    let slug = slugify(short_name, STORY_SLUG_WORDS);
    if feature_id.starts_with(&format!("{project}-")) {
        format!("{feature_id}-story-{n:02}-{slug}")
    } else {
        format!("{project}-{feature_id}-story-{n:02}-{slug}")
    }
}

/// Project name normalised for use inside ids
///
/// Returns `proj` for a name without any alphanumeric characters.
#[must_use]
pub fn project_slug(project: &str) -> String {
    slug_or(project, usize::MAX, "proj")
}

/// Kebab-case slug of the first `max_words` alphanumeric words of `text`
///
/// Returns `item` for text without any alphanumeric characters.
#[must_use]
pub fn slugify(text: &str, max_words: usize) -> String {
    slug_or(text, max_words, "item")
}

fn slug_or(text: &str, max_words: usize, fallback: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(max_words)
        .map(str::to_ascii_lowercase)
        .collect();
    if words.is_empty() {
        fallback.to_string()
    } else {
        words.join("-")
    }
}
