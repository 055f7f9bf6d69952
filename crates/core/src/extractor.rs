//! Raw skill phrase extraction through an LLM chat provider.

use providers::{ChatRequest, LlmProvider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const SYSTEM_PROMPT: &str = r#"
You are an expert Skill Extraction engine.

Task:
- Extract ONLY skills (technologies, tools, frameworks, methodologies, soft skills, hard skills) from the given text.
- A term must be treated as a skill ONLY if it is used in a professional, technical, educational, or workplace context.
- Ignore terms that appear in non-skill meanings such as animals, food, geography, common nouns, or everyday conversation.
- Output a JSON list of extracted skills as shown below.
- Output Format:
    ["Python", "Project Management", "Machine Learning"]
Rules:
- Do NOT include any explanations or extra text.
- Do NOT include duplicates (case-insensitive).
- Skill names should be clean, human-readable phrases.
- If a term is ambiguous, include it ONLY when surrounding context clearly indicates it is a skill.
- If no skills are found, return [].
"#;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extractor provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("extractor timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("malformed extractor output: {0}")]
    Malformed(String),
}

#[async_trait::async_trait]
pub trait PhraseExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<String>, ExtractError>;

    /// Name of the model behind the extractor, for health reporting.
    fn model(&self) -> &str {
        "unknown"
    }
}

pub struct LlmExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl PhraseExtractor for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<String>, ExtractError> {
        let resp = self
            .llm
            .chat(&ChatRequest {
                system: Some(SYSTEM_PROMPT.to_string()),
                user: text.to_string(),
            })
            .await?;
        debug!(content = %resp.content, "extractor response");
        parse_phrase_list(&resp.content)
    }

    fn model(&self) -> &str {
        self.llm.model()
    }
}

/// Decode the model output as a JSON array of strings. Markdown code fences
/// are stripped first; anything that is not exactly a list of strings is
/// reported as malformed.
pub fn parse_phrase_list(content: &str) -> Result<Vec<String>, ExtractError> {
    let cleaned = content.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| ExtractError::Malformed(e.to_string()))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(ExtractError::Malformed(format!(
                "expected a list, got {}",
                kind(&other)
            )))
        }
    };
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => Ok(s),
            other => Err(ExtractError::Malformed(format!(
                "expected list of strings, found {}",
                kind(&other)
            ))),
        })
        .collect()
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_list() {
        let phrases = parse_phrase_list(r#"["Python", "Project Management"]"#).unwrap();
        assert_eq!(phrases, vec!["Python", "Project Management"]);
    }

    #[test]
    fn strips_code_fences() {
        let phrases = parse_phrase_list("```json\n[\"Rust\"]\n```").unwrap();
        assert_eq!(phrases, vec!["Rust"]);
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(parse_phrase_list(" [] ").unwrap().is_empty());
    }

    #[test]
    fn duplicates_and_casing_are_kept_verbatim() {
        let phrases = parse_phrase_list(r#"["sql", "SQL", "sql"]"#).unwrap();
        assert_eq!(phrases, vec!["sql", "SQL", "sql"]);
    }

    #[test]
    fn rejects_non_list_output() {
        for raw in [
            "Python, Java",
            r#"{"skills": ["Python"]}"#,
            r#""Python""#,
            "42",
            r#"["Python", 3]"#,
            "['Python']",
            "",
        ] {
            assert!(
                matches!(parse_phrase_list(raw), Err(ExtractError::Malformed(_))),
                "accepted {raw:?}"
            );
        }
    }
}
