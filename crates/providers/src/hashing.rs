use crate::{EmbedResponse, EmbeddingProvider, ProviderError};

pub const DEFAULT_DIMENSIONS: usize = 384;

/// Local embedder: signed feature hashing of lowercase character trigrams and
/// whole words. Deterministic across runs and platforms, needs no model.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimensions: usize,
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        for word in lower.split_whitespace() {
            self.accumulate(&mut vector, "w", word);
        }

        let padded: Vec<char> = format!(" {} ", lower.split_whitespace().collect::<Vec<_>>().join(" "))
            .chars()
            .collect();
        for gram in padded.windows(3) {
            if gram.iter().all(|c| c.is_whitespace()) {
                continue;
            }
            let gram: String = gram.iter().collect();
            self.accumulate(&mut vector, "g", &gram);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], kind: &str, feature: &str) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_bytes());
        hasher.update(&[0]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();
        let mut slot = [0u8; 8];
        slot.copy_from_slice(&bytes[..8]);
        let idx = (u64::from_le_bytes(slot) % self.dimensions as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign;
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| self.embed_one(t)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[tokio::test]
    async fn embeddings_are_deterministic_and_fixed_width() {
        let provider = HashingProvider::new(64);
        let texts = vec!["Project Management".to_string(), "Rust".to_string()];
        let first = provider.embed(&texts).await.unwrap();
        let second = provider.embed(&texts).await.unwrap();
        assert_eq!(first.vectors, second.vectors);
        assert!(first.vectors.iter().all(|v| v.len() == 64));
    }

    #[tokio::test]
    async fn shared_words_score_higher_than_unrelated_words() {
        let provider = HashingProvider::default();
        let texts = vec![
            "python programming".to_string(),
            "Python".to_string(),
            "Java".to_string(),
        ];
        let resp = provider.embed(&texts).await.unwrap();
        let python = cosine(&resp.vectors[0], &resp.vectors[1]);
        let java = cosine(&resp.vectors[0], &resp.vectors[2]);
        assert!(python > java, "python={python} java={java}");
    }

    #[tokio::test]
    async fn blank_text_embeds_to_zero_vector() {
        let provider = HashingProvider::new(16);
        let resp = provider.embed(&["   ".to_string()]).await.unwrap();
        assert!(resp.vectors[0].iter().all(|x| *x == 0.0));
    }
}
