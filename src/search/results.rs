//! Result assembly: stored-field retrieval and term statistics.

use serde::Serialize;
use std::collections::BTreeMap;
use tantivy::schema::Value;
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{DocAddress, TantivyDocument};

use crate::index::schema::IndexSchema;

/// A ranked search hit. The address is valid against the reader generation
/// that produced it; fetch stored fields promptly.
#[derive(Debug, Clone, Copy)]
pub struct SearchHit {
    pub address: DocAddress,
    pub score: f32,
}

/// Stored fields of one indexed file.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedDocument {
    /// Absolute path, the unique document key.
    pub path: String,
    /// Extracted file text.
    pub contents: String,
}

/// Which field a hit was judged to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    Path,
    Contents,
}

/// Pull the stored fields out of a retrieved document.
pub fn to_indexed_document(doc: &TantivyDocument, schema: &IndexSchema) -> IndexedDocument {
    IndexedDocument {
        path: get_text_field(doc, schema.path_string),
        contents: get_text_field(doc, schema.contents),
    }
}

/// Count term frequencies of the stored contents using the index's own
/// analyzer, yielding the same term → total-frequency mapping the postings
/// hold for this document.
pub fn term_frequencies(mut analyzer: TextAnalyzer, contents: &str) -> BTreeMap<String, u64> {
    let mut frequencies = BTreeMap::new();
    let mut stream = analyzer.token_stream(contents);
    stream.process(&mut |token| {
        *frequencies.entry(token.text.clone()).or_insert(0) += 1;
    });
    frequencies
}

fn get_text_field(doc: &TantivyDocument, field: tantivy::schema::Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}
