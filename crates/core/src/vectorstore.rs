//! Exact in-memory nearest-neighbour index over taxonomy name embeddings.

use crate::embeddings::{normalize, Embedder};
use crate::error::SkillMapError;
use crate::search::{dot, top_k};
use crate::taxonomy::TaxonomyStore;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Position of the entry in the taxonomy store.
    pub position: usize,
    pub name: String,
    pub score: f32,
}

/// Unit vectors aligned with the taxonomy store's entry order. Built once,
/// read-only afterwards.
pub struct EmbeddingIndex {
    names: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
    embedder: Embedder,
}

impl EmbeddingIndex {
    pub async fn build(store: &TaxonomyStore, embedder: Embedder) -> Result<Self, SkillMapError> {
        if store.is_empty() {
            return Err(SkillMapError::EmptyTaxonomy);
        }
        let names: Vec<String> = store
            .entries()
            .iter()
            .map(|e| e.canonical_name.clone())
            .collect();
        let raw = embedder.encode(&names).await?;

        let mut vectors = Vec::with_capacity(raw.len());
        let mut dimensions = None;
        for (name, vector) in names.iter().zip(raw) {
            let expected = *dimensions.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(SkillMapError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            vectors.push(normalize(vector, name)?);
        }
        let dimensions = dimensions.unwrap_or_default();

        info!(
            "Embedding index built with {} vectors, dim {}.",
            vectors.len(),
            dimensions
        );
        Ok(Self {
            names,
            vectors,
            dimensions,
            embedder,
        })
    }

    /// The `k` closest entries to `text` by cosine similarity, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, SkillMapError> {
        if k == 0 {
            return Err(SkillMapError::InvalidTopK(0));
        }
        let vector = self.embedder.encode_one(text).await?;
        let vector = normalize(vector, text)?;
        self.query_vector(&vector, k)
    }

    /// Search with an already normalized query vector.
    pub fn query_vector(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, SkillMapError> {
        if k == 0 {
            return Err(SkillMapError::InvalidTopK(0));
        }
        if vector.len() != self.dimensions {
            return Err(SkillMapError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        let scores: Vec<f32> = self
            .vectors
            .iter()
            .map(|v| dot(v, vector).clamp(-1.0, 1.0))
            .collect();
        Ok(top_k(&scores, k)
            .into_iter()
            .map(|(position, score)| SearchHit {
                position,
                name: self.names[position].clone(),
                score,
            })
            .collect())
    }
}
