//! Typed failure taxonomy for the discovery and retrieval core.
//!
//! Corpus-level failures propagate to the caller, who must choose a fallback
//! strategy. Per-item failures (a bad citation, an unknown author, one failed
//! fetch) are isolated by the components that encounter them and never abort
//! the rest of a batch.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The corpus index could not be loaded. Recoverable: the caller is
    /// expected to fall back to an external discovery path.
    #[error("corpus unavailable at {}: {reason}", .path.display())]
    CorpusUnavailable { path: PathBuf, reason: String },

    /// A matched reference pattern could not be mapped to a canonical
    /// location. Dropped by the extractor, never guessed into existence.
    #[error("citation '{matched}' does not resolve to a known location")]
    UnresolvableCitation { matched: String },

    /// No mapping exists for the requested commentator. The author is
    /// skipped for that request; other authors proceed.
    #[error("no reference mapping for author '{0}'")]
    UnknownAuthor(String),

    /// Discovery produced zero hits after both the combined-phrase and
    /// per-term fallback passes.
    #[error("no citation evidence found for topics {topics:?}")]
    NoEvidenceFound { topics: Vec<String> },

    /// The external text service failed for one reference.
    #[error("text fetch failed for '{reference}': {reason}")]
    Fetch { reference: String, reason: String },
}

impl Error {
    pub fn corpus_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorpusUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Fetch {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}
