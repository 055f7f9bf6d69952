use crate::error::SkillMapError;
use providers::EmbeddingProvider;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared handle on the embedding provider used both at index build and per query.
///
/// Inputs are sent in batches of `batch_size`. When `max_concurrency` is set,
/// in-flight provider calls are bounded by a semaphore so a backend that cannot
/// serve parallel requests sees them queued instead.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    permits: Option<Arc<Semaphore>>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: 64,
            permits: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.permits = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Encode `texts`, one vector per input, in input order.
    pub async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SkillMapError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let _permit = match &self.permits {
                Some(sem) => Some(
                    sem.acquire()
                        .await
                        .map_err(|e| providers::ProviderError::RequestFailed(e.to_string()))?,
                ),
                None => None,
            };
            let resp = self.provider.embed(batch).await?;
            if resp.vectors.len() != batch.len() {
                return Err(SkillMapError::VectorCountMismatch {
                    expected: batch.len(),
                    actual: resp.vectors.len(),
                });
            }
            vectors.extend(resp.vectors);
        }
        Ok(vectors)
    }

    pub async fn encode_one(&self, text: &str) -> Result<Vec<f32>, SkillMapError> {
        let mut vectors = self.encode(&[text.to_string()]).await?;
        vectors.pop().ok_or(SkillMapError::VectorCountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

/// Scale `vector` to unit length. A zero or non-finite norm is rejected rather
/// than producing NaN scores.
pub fn normalize(mut vector: Vec<f32>, label: &str) -> Result<Vec<f32>, SkillMapError> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(SkillMapError::DegenerateEmbedding(label.to_string()));
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::{EmbedResponse, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        async fn embed(&self, _texts: &[String]) -> Result<EmbedResponse, ProviderError> {
            Ok(EmbedResponse {
                vectors: vec![vec![1.0]],
            })
        }
    }

    /// Echoes each numeric input as a one-element vector and records call shape.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            texts
                .iter()
                .map(|t| {
                    t.parse::<f32>()
                        .map(|x| vec![x])
                        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|vectors| EmbedResponse { vectors })
        }
    }

    fn numbers(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| i.to_string()).collect()
    }

    #[test]
    fn normalize_produces_unit_length() {
        let v = normalize(vec![3.0, 4.0], "x").unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_rejects_zero_vector() {
        let err = normalize(vec![0.0, 0.0], "Blank Skill").unwrap_err();
        assert!(matches!(err, SkillMapError::DegenerateEmbedding(name) if name == "Blank Skill"));
    }

    #[tokio::test]
    async fn encode_checks_vector_count_per_batch() {
        let embedder = Embedder::new(Arc::new(ShortProvider)).with_batch_size(2);
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embedder.encode(&texts).await.unwrap_err();
        assert!(matches!(
            err,
            SkillMapError::VectorCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn batches_are_reassembled_in_input_order() {
        let provider = Arc::new(CountingProvider::default());
        let embedder = Embedder::new(provider.clone()).with_batch_size(2);

        let vectors = embedder.encode(&numbers(0..5)).await.unwrap();
        assert_eq!(
            vectors,
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]]
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_permit_serializes_concurrent_encodes() {
        let provider = Arc::new(CountingProvider::default());
        let embedder = Embedder::new(provider.clone()).with_max_concurrency(Some(1));
        let other = embedder.clone();

        let (first, second) = (numbers(0..2), numbers(2..4));
        let (a, b) = tokio::join!(embedder.encode(&first), other.encode(&second));
        assert_eq!(a.unwrap(), vec![vec![0.0], vec![1.0]]);
        assert_eq!(b.unwrap(), vec![vec![2.0], vec![3.0]]);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unbounded_embedder_overlaps_calls() {
        let provider = Arc::new(CountingProvider::default());
        let embedder = Embedder::new(provider.clone());
        let other = embedder.clone();

        let (first, second) = (numbers(0..1), numbers(1..2));
        let (a, b) = tokio::join!(embedder.encode(&first), other.encode(&second));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(provider.peak.load(Ordering::SeqCst), 2);
    }
}
