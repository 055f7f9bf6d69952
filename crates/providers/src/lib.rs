//! Provider abstractions for LLMs and embeddings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod hashing;
pub mod ollama;
pub mod openai;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

/// A single-turn chat exchange: optional system instructions plus one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: Option<String>,
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError>;
}

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Model identifier reported by health checks.
    fn model(&self) -> &str;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    embeddings: HashMap<String, Arc<dyn EmbeddingProvider>>,
    llms: HashMap<String, Arc<dyn LlmProvider>>,
    pub preferred_embedding: Option<String>,
    pub preferred_llm: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, name: &str, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings.insert(name.to_string(), provider);
        self
    }

    pub fn with_llm(mut self, name: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.llms.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_embedding(mut self, name: &str) -> Self {
        self.preferred_embedding = Some(name.to_string());
        self
    }

    pub fn set_preferred_llm(mut self, name: &str) -> Self {
        self.preferred_llm = Some(name.to_string());
        self
    }

    pub fn embedding(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        resolve(
            "embedding",
            &self.embeddings,
            name.or(self.preferred_embedding.as_deref()),
        )
    }

    pub fn llm(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        resolve("llm", &self.llms, name.or(self.preferred_llm.as_deref()))
    }
}

/// Look up `key` in `providers`; the error names the requested key and what is registered.
fn resolve<P: ?Sized>(
    kind: &str,
    providers: &HashMap<String, Arc<P>>,
    key: Option<&str>,
) -> Result<Arc<P>, ProviderError> {
    let key = key.ok_or_else(|| {
        ProviderError::UnknownProvider(format!("no {kind} provider configured"))
    })?;
    providers.get(key).cloned().ok_or_else(|| {
        let mut known: Vec<&str> = providers.keys().map(String::as_str).collect();
        known.sort_unstable();
        ProviderError::UnknownProvider(format!(
            "{kind} provider {key:?} is not registered (available: {})",
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingProvider;

    #[test]
    fn registry_falls_back_to_preferred_embedding() {
        let reg = ProviderRegistry::new()
            .with_embedding("hashing", Arc::new(HashingProvider::default()))
            .set_preferred_embedding("hashing");
        assert!(reg.embedding(None).is_ok());
        assert!(reg.embedding(Some("hashing")).is_ok());
        assert!(matches!(
            reg.embedding(Some("openai")),
            Err(ProviderError::UnknownProvider(msg))
                if msg.contains("\"openai\"") && msg.contains("available: hashing")
        ));
    }

    #[test]
    fn registry_without_llm_reports_unknown_provider() {
        let reg = ProviderRegistry::new();
        assert!(matches!(
            reg.llm(None),
            Err(ProviderError::UnknownProvider(msg)) if msg == "no llm provider configured"
        ));
        let reg = reg.set_preferred_llm("ollama");
        assert!(matches!(
            reg.llm(None),
            Err(ProviderError::UnknownProvider(msg)) if msg.contains("(available: none)")
        ));
    }
}
