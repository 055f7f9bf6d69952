use providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillMapError {
    #[error("taxonomy is empty: no source record carried a usable name")]
    EmptyTaxonomy,
    #[error("degenerate embedding for {0:?}: vector norm is zero or not finite")]
    DegenerateEmbedding(String),
    #[error("top_k must be a positive integer, got {0}")]
    InvalidTopK(i64),
    #[error("embedding provider failed: {0}")]
    Embedding(#[from] ProviderError),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding provider returned {actual} vectors for {expected} inputs")]
    VectorCountMismatch { expected: usize, actual: usize },
    #[error("index hit at position {position} has no entry in a taxonomy of {entries}")]
    IndexOutOfSync { position: usize, entries: usize },
    #[error("taxonomy source {path}: {reason}")]
    Source { path: String, reason: String },
}

impl SkillMapError {
    /// True when the failure came from the embedder rather than from caller input.
    pub fn is_embedding_failure(&self) -> bool {
        matches!(
            self,
            SkillMapError::Embedding(_)
                | SkillMapError::DimensionMismatch { .. }
                | SkillMapError::VectorCountMismatch { .. }
                | SkillMapError::DegenerateEmbedding(_)
        )
    }
}
