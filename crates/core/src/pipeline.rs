use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::error::SkillMapError;
use crate::extractor::{ExtractError, LlmExtractor, PhraseExtractor};
use crate::matcher::Matcher;
use crate::models::{ExtractionReport, MatchResult};
use crate::sources;
use crate::taxonomy::TaxonomyStore;
use crate::vectorstore::EmbeddingIndex;
use anyhow::Context;
use futures::future::try_join_all;
use providers::hashing::{HashingProvider, DEFAULT_DIMENSIONS};
use providers::ollama::{OllamaConfig, OllamaProvider, DEFAULT_BASE_URL};
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Reject non-positive `top_k` before any retrieval work starts.
pub fn validate_top_k(top_k: i64) -> Result<usize, SkillMapError> {
    if top_k <= 0 {
        return Err(SkillMapError::InvalidTopK(top_k));
    }
    usize::try_from(top_k).map_err(|_| SkillMapError::InvalidTopK(top_k))
}

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Clone)]
pub struct SkillService {
    matcher: Matcher,
    extractor: Arc<dyn PhraseExtractor>,
    extract_timeout: Duration,
    default_top_k: usize,
}

impl SkillService {
    pub fn new(matcher: Matcher, extractor: Arc<dyn PhraseExtractor>) -> Self {
        Self {
            matcher,
            extractor,
            extract_timeout: Duration::from_secs(60),
            default_top_k: 2,
        }
    }

    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// `top_k` used when a request does not carry one.
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn taxonomy_size(&self) -> usize {
        self.matcher.store().len()
    }

    pub fn extractor_model(&self) -> &str {
        self.extractor.model()
    }

    pub async fn match_phrase(
        &self,
        phrase: &str,
        k: usize,
    ) -> Result<Vec<MatchResult>, SkillMapError> {
        self.matcher.match_phrase(phrase, k).await
    }

    /// Extract raw phrases from `text` and map each to its taxonomy matches.
    ///
    /// Extractor failures degrade to an empty report; embedding failures fail
    /// the whole call.
    pub async fn extract_and_map(
        &self,
        text: &str,
        k: usize,
    ) -> Result<ExtractionReport, SkillMapError> {
        if k == 0 {
            return Err(SkillMapError::InvalidTopK(0));
        }

        let raw_phrases = match self.extract_phrases(text).await {
            Ok(phrases) => phrases,
            Err(e) => {
                warn!("Skill extraction failed, returning no phrases: {}", e);
                Vec::new()
            }
        };

        let unique: Vec<String> = {
            let mut seen = HashSet::new();
            raw_phrases
                .iter()
                .filter(|p| seen.insert(p.as_str()))
                .cloned()
                .collect()
        };
        let matches = try_join_all(unique.iter().map(|phrase| self.map_phrase(phrase, k))).await?;
        let mapping = unique.into_iter().zip(matches).collect();

        Ok(ExtractionReport {
            raw_phrases,
            mapping,
        })
    }

    /// Blank phrases carry nothing to embed and map to no matches.
    async fn map_phrase(&self, phrase: &str, k: usize) -> Result<Vec<MatchResult>, SkillMapError> {
        if phrase.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.matcher.match_phrase(phrase, k).await
    }

    async fn extract_phrases(&self, text: &str) -> Result<Vec<String>, ExtractError> {
        tokio::time::timeout(self.extract_timeout, self.extractor.extract(text))
            .await
            .map_err(|_| ExtractError::Timeout(self.extract_timeout))?
    }
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let llm_timeout = Some(Duration::from_secs(config.extractor.timeout_secs));
    let dimensions = config.embeddings.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
    let mut reg = ProviderRegistry::new()
        .with_embedding("hashing", Arc::new(HashingProvider::new(dimensions)));

    if let Some(key) = std::env::var_os("OPENAI_API_KEY") {
        let base = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base,
            embedding_model: config.embeddings.model.clone(),
            chat_model: config.extractor.model.clone(),
            timeout: llm_timeout,
        });
        reg = reg
            .with_embedding("openai", Arc::new(provider.clone()))
            .with_llm("openai", Arc::new(provider));
    }

    let base = std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let provider = OllamaProvider::new(OllamaConfig {
        base_url: base,
        embedding_model: config.embeddings.model.clone(),
        chat_model: config.extractor.model.clone(),
        timeout: llm_timeout,
    });
    reg = reg
        .with_embedding("ollama", Arc::new(provider.clone()))
        .with_llm("ollama", Arc::new(provider));

    reg.set_preferred_embedding(&config.embeddings.provider)
        .set_preferred_llm(&config.extractor.provider)
}

/// Load the taxonomy sources and build the store, embedder and index.
pub async fn build_matcher(config: &AppConfig, registry: &ProviderRegistry) -> anyhow::Result<Matcher> {
    info!("Loading taxonomy sources...");
    let tables = sources::load_sources(&config.taxonomy.sources).context("load taxonomy sources")?;
    let store = TaxonomyStore::build(tables).context("build taxonomy store")?;

    let provider = registry
        .embedding(None)
        .context("resolve embedding provider")?;
    let embedder = Embedder::new(provider)
        .with_batch_size(config.embeddings.batch_size)
        .with_max_concurrency(config.embeddings.max_concurrency);

    info!("Creating embedding index...");
    let index = EmbeddingIndex::build(&store, embedder)
        .await
        .context("build embedding index")?;

    Ok(Matcher::new(Arc::new(store), Arc::new(index)).with_max_codes(config.matching.max_codes))
}

pub fn build_extractor(registry: &ProviderRegistry) -> anyhow::Result<Arc<dyn PhraseExtractor>> {
    let llm = registry.llm(None).context("resolve extractor provider")?;
    Ok(Arc::new(LlmExtractor::new(llm)))
}

pub async fn build_service(config: &AppConfig) -> anyhow::Result<SkillService> {
    let registry = build_registry(config);
    let matcher = build_matcher(config, &registry).await?;
    let extractor = build_extractor(&registry)?;
    Ok(SkillService::new(matcher, extractor)
        .with_extract_timeout(Duration::from_secs(config.extractor.timeout_secs))
        .with_default_top_k(config.matching.default_top_k))
}
