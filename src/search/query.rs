//! Query synthesis from free-text input.
//!
//! Free text is split on whitespace and turned into a boolean OR across two
//! fields with field-specific wildcard policy: path terms match as infix
//! (`*term*`) against the raw path key, contents terms match as prefix
//! (`term*`) against the analyzed text. Terms are regex-escaped before being
//! compiled, so query construction is practically infallible for non-empty
//! input.

use crate::error::{Error, Result};
use crate::index::schema::IndexSchema;
use tantivy::query::{BooleanQuery, Occur, Query, RegexQuery};
use tantivy::schema::Field;

/// Builds the dual-field OR query for a handle.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    path_string: Field,
    contents: Field,
}

impl QueryBuilder {
    pub fn new(schema: &IndexSchema) -> Self {
        Self {
            path_string: schema.path_string,
            contents: schema.contents,
        }
    }

    /// Split free text into query terms. Space delimits; there is no phrase
    /// or quoting syntax.
    pub fn terms(input: &str) -> Vec<&str> {
        input.split_whitespace().collect()
    }

    /// Build the two-field OR query for the given input.
    pub fn build(&self, input: &str) -> Result<BooleanQuery> {
        let terms = Self::terms(input);
        if terms.is_empty() {
            return Err(Error::InvalidQuery("empty query".to_string()));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(terms.len() * 2);
        for term in &terms {
            clauses.push((Occur::Should, Box::new(self.path_term_query(term)?)));
            clauses.push((Occur::Should, Box::new(self.contents_term_query(term)?)));
        }

        Ok(BooleanQuery::new(clauses))
    }

    /// Single-field probe query for the path key, using its infix policy.
    pub fn path_probe(&self, input: &str) -> Result<BooleanQuery> {
        self.field_probe(input, |b, t| b.path_term_query(t))
    }

    /// Single-field probe query for the contents field, using its prefix policy.
    pub fn contents_probe(&self, input: &str) -> Result<BooleanQuery> {
        self.field_probe(input, |b, t| b.contents_term_query(t))
    }

    fn field_probe(
        &self,
        input: &str,
        term_query: impl Fn(&Self, &str) -> Result<RegexQuery>,
    ) -> Result<BooleanQuery> {
        let terms = Self::terms(input);
        if terms.is_empty() {
            return Err(Error::InvalidQuery("empty query".to_string()));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(terms.len());
        for term in &terms {
            clauses.push((Occur::Should, Box::new(term_query(self, term)?)));
        }
        Ok(BooleanQuery::new(clauses))
    }

    /// `*term*` against the raw path term, so any path substring matches.
    fn path_term_query(&self, term: &str) -> Result<RegexQuery> {
        let pattern = format!(".*{}.*", regex::escape(term));
        RegexQuery::from_pattern(&pattern, self.path_string)
            .map_err(|e| Error::InvalidQuery(e.to_string()))
    }

    /// `term*` against analyzed contents terms. The default analyzer
    /// lowercases, so the query term is lowercased to match.
    fn contents_term_query(&self, term: &str) -> Result<RegexQuery> {
        let pattern = format!("{}.*", regex::escape(&term.to_lowercase()));
        RegexQuery::from_pattern(&pattern, self.contents)
            .map_err(|e| Error::InvalidQuery(e.to_string()))
    }
}
