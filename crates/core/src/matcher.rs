use crate::error::SkillMapError;
use crate::models::MatchResult;
use crate::taxonomy::TaxonomyStore;
use crate::vectorstore::EmbeddingIndex;
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_MAX_CODES: usize = 5;

/// Maps one raw phrase to ranked taxonomy matches, collapsing entries that
/// only differ by casing once title-cased.
#[derive(Clone)]
pub struct Matcher {
    store: Arc<TaxonomyStore>,
    index: Arc<EmbeddingIndex>,
    max_codes: usize,
}

impl Matcher {
    pub fn new(store: Arc<TaxonomyStore>, index: Arc<EmbeddingIndex>) -> Self {
        Self {
            store,
            index,
            max_codes: DEFAULT_MAX_CODES,
        }
    }

    pub fn with_max_codes(mut self, max_codes: usize) -> Self {
        self.max_codes = max_codes;
        self
    }

    pub fn store(&self) -> &TaxonomyStore {
        &self.store
    }

    pub async fn match_phrase(
        &self,
        phrase: &str,
        k: usize,
    ) -> Result<Vec<MatchResult>, SkillMapError> {
        let hits = self.index.query(phrase, k).await?;

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let display_name = title_case(&hit.name);
            if !seen.insert(display_name.clone()) {
                continue;
            }
            let entry = self.store.entry_at(hit.position).ok_or(
                SkillMapError::IndexOutOfSync {
                    position: hit.position,
                    entries: self.store.len(),
                },
            )?;
            results.push(MatchResult {
                display_name,
                score: hit.score,
                provenance_codes: entry
                    .provenance_codes
                    .iter()
                    .take(self.max_codes)
                    .cloned()
                    .collect(),
                identity: entry.identity,
            });
        }
        Ok(results)
    }
}

/// Word title case: a letter is upper-cased when it does not follow another
/// letter, lower-cased otherwise. Everything else is kept as is.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
