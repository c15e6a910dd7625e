use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Structural failure of a whole source file. The file is skipped, the
    /// rest of the batch continues.
    #[error("malformed source {path}: {reason}")]
    MalformedSource { path: String, reason: String },

    /// Query-time embedding space does not match the space the collection
    /// was indexed with. Fatal configuration error, never retried.
    #[error("embedding space mismatch: collection indexed with '{indexed}', query uses '{query}'")]
    EmbeddingSpaceMismatch { indexed: String, query: String },

    /// A whole index batch was aborted; nothing of it was written to either
    /// index and the same batch may be retried.
    #[error("index batch {batch} failed: {reason}")]
    BatchAborted { batch: usize, reason: String },

    /// The lexical and vector indices no longer agree. This is a consistency
    /// bug, not a recoverable state.
    #[error("lexical and vector indices diverged: {0}")]
    IndexDiverged(String),

    /// The generation capability failed or timed out; the turn is failed and
    /// the conversation window stays untouched.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
