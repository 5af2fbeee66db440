use thiserror::Error;

/// Errors raised while loading a plan or tagging a document.
///
/// Whether an error is fatal depends on where it surfaces: the engine aborts
/// the run on `Io`, `Plan`, `Pdf` and `Encrypted` before or after tagging, but
/// only records a warning when one of these escapes a single element.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tagging plan: {0}")]
    Plan(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("encrypted documents are not supported")]
    Encrypted,

    #[error("page {0} out of range")]
    PageOutOfRange(i64),

    #[error("invalid structure node handle {0}")]
    InvalidNode(usize),

    #[error("content stream syntax error at byte {offset}: {reason}")]
    Lex { offset: usize, reason: String },

    #[error("content stream rewrite failed: {0}")]
    Rewrite(String),
}

impl From<serde_json::Error> for TaggingError {
    fn from(e: serde_json::Error) -> Self {
        TaggingError::Plan(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TaggingError>;
