//! Core library: taxonomy construction, embedding index, matching, extraction.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod sources;
pub mod taxonomy;
pub mod vectorstore;

pub use error::SkillMapError;
