//! Error types for document ingest
//!
//! Splitting and summarization never fail; only front-matter handling can.

/// Errors while reading a document envelope
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Document does not start with a `---` front-matter block
    #[error("missing front matter: document must start with a '---' block")]
    MissingFrontMatter,

    /// Front-matter block is never closed
    #[error("unterminated front matter: no closing '---' line")]
    UnterminatedFrontMatter,

    /// Front matter is not valid YAML or lacks required keys
    #[error("invalid front matter: {0}")]
    InvalidFrontMatter(#[from] serde_yaml::Error),

    /// Front matter carries an empty `document_id`
    #[error("front matter field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Result type alias for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;
