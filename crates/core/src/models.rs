use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// A canonical skill in the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub canonical_name: String,
    pub identity: Uuid,
    pub provenance_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub display_name: String,
    pub score: f32,
    pub provenance_codes: Vec<String>,
    pub identity: Uuid,
}

/// Raw phrases as the extractor returned them, plus matches for each distinct
/// phrase in first-seen order. Serialized with the wire names
/// `extracted_phrases` / `mapping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    #[serde(rename = "extracted_phrases")]
    pub raw_phrases: Vec<String>,
    #[serde(serialize_with = "serialize_mapping")]
    pub mapping: Vec<(String, Vec<MatchResult>)>,
}

impl ExtractionReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn matches_for(&self, phrase: &str) -> Option<&[MatchResult]> {
        self.mapping
            .iter()
            .find(|(p, _)| p == phrase)
            .map(|(_, m)| m.as_slice())
    }
}

fn serialize_mapping<S>(
    mapping: &[(String, Vec<MatchResult>)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(mapping.len()))?;
    for (phrase, matches) in mapping {
        map.serialize_entry(phrase, matches)?;
    }
    map.end()
}
