use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
        }
    }
}

/// One tabular taxonomy source: which column holds the skill name and which
/// holds its classification code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: String,
    pub name_column: String,
    #[serde(default = "default_code_column")]
    pub code_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Upper bound on in-flight embed calls; 1 serializes a non-reentrant backend.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: String::new(),
            batch_size: default_batch_size(),
            max_concurrency: None,
            dimensions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_max_codes")]
    pub max_codes: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_codes: default_max_codes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: None,
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            path: "ONet_Skills_Taxonomy/Technology Skills.xlsx".to_string(),
            name_column: "Example".to_string(),
            code_column: default_code_column(),
        },
        SourceConfig {
            path: "ONet_Skills_Taxonomy/Skills.xlsx".to_string(),
            name_column: "Element Name".to_string(),
            code_column: default_code_column(),
        },
    ]
}

fn default_code_column() -> String {
    "O*NET-SOC Code".to_string()
}

fn default_embedding_provider() -> String {
    "hashing".to_string()
}

fn default_batch_size() -> usize {
    64
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_top_k() -> usize {
    2
}

fn default_max_codes() -> usize {
    5
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("SKILLMAP")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [matching]
            default_top_k = 4

            [[taxonomy.sources]]
            path = "skills.json"
            name_column = "name"
            "#
        )
        .unwrap();

        let cfg = load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(cfg.matching.default_top_k, 4);
        assert_eq!(cfg.matching.max_codes, 5);
        assert_eq!(cfg.taxonomy.sources.len(), 1);
        assert_eq!(cfg.taxonomy.sources[0].code_column, "O*NET-SOC Code");
        assert_eq!(cfg.embeddings.provider, "hashing");
        assert_eq!(cfg.extractor.model, "qwen2.5:7b");
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn default_sources_follow_onet_layout() {
        let cfg = AppConfig::default();
        let columns: Vec<&str> = cfg
            .taxonomy
            .sources
            .iter()
            .map(|s| s.name_column.as_str())
            .collect();
        assert_eq!(columns, vec!["Example", "Element Name"]);
    }
}
