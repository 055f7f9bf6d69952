//! Taxonomy store: merges heterogeneous source tables into one entry per
//! trimmed skill name with a stable, name-derived identity.

use crate::error::SkillMapError;
use crate::models::TaxonomyEntry;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

/// One row of a source table. `name` is optional because spreadsheet cells may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub name: Option<String>,
    pub code: Option<String>,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            code: Some(code.into()),
        }
    }
}

/// Identity of a taxonomy entry: UUIDv5 in the DNS namespace over the canonical name.
pub fn identity_for(canonical_name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, canonical_name.as_bytes())
}

/// Accumulates source records before the store is frozen.
#[derive(Debug, Default)]
pub struct TaxonomyBuilder {
    order: Vec<String>,
    codes: HashMap<String, BTreeSet<String>>,
    skipped: usize,
}

impl TaxonomyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: SourceRecord) {
        let name = match record.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                self.skipped += 1;
                return;
            }
        };
        if !self.codes.contains_key(&name) {
            self.order.push(name.clone());
        }
        let codes = self.codes.entry(name).or_default();
        if let Some(code) = record.code.as_deref().map(str::trim) {
            if !code.is_empty() {
                codes.insert(code.to_string());
            }
        }
    }

    pub fn add_table<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = SourceRecord>,
    {
        for record in records {
            self.add(record);
        }
    }

    pub fn build(mut self) -> Result<TaxonomyStore, SkillMapError> {
        if self.order.is_empty() {
            return Err(SkillMapError::EmptyTaxonomy);
        }
        if self.skipped > 0 {
            debug!("Skipped {} source records without a name.", self.skipped);
        }

        let entries: Vec<TaxonomyEntry> = self
            .order
            .into_iter()
            .map(|name| {
                let codes = self.codes.remove(&name).unwrap_or_default();
                TaxonomyEntry {
                    identity: identity_for(&name),
                    provenance_codes: codes.into_iter().collect(),
                    canonical_name: name,
                }
            })
            .collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.canonical_name.clone(), i))
            .collect();

        info!("Loaded {} taxonomy entries.", entries.len());
        Ok(TaxonomyStore { entries, by_name })
    }
}

/// Immutable set of taxonomy entries in first-appearance order.
#[derive(Debug, Clone)]
pub struct TaxonomyStore {
    entries: Vec<TaxonomyEntry>,
    by_name: HashMap<String, usize>,
}

impl TaxonomyStore {
    /// Merge the given tables, in order, into a frozen store.
    pub fn build<T>(tables: T) -> Result<Self, SkillMapError>
    where
        T: IntoIterator,
        T::Item: IntoIterator<Item = SourceRecord>,
    {
        let mut builder = TaxonomyBuilder::new();
        for table in tables {
            builder.add_table(table);
        }
        builder.build()
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn get(&self, canonical_name: &str) -> Option<&TaxonomyEntry> {
        self.by_name.get(canonical_name).map(|&i| &self.entries[i])
    }

    pub fn entry_at(&self, position: usize) -> Option<&TaxonomyEntry> {
        self.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
