//! Search results returned by the course vector store.

use super::{Metadata, QueryResult};

/// Matched documents with their metadata and distances.
///
/// The three lists are parallel and ordered by ascending distance. When `error` is
/// set they are empty and the error is final for that search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<Metadata>,
    pub distances: Vec<f32>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Create results from parallel lists.
    pub fn new(documents: Vec<String>, metadata: Vec<Metadata>, distances: Vec<f32>) -> Self {
        Self {
            documents,
            metadata,
            distances,
            error: None,
        }
    }

    /// Unwrap the first batch of a backend query result.
    pub fn from_query(result: QueryResult) -> Self {
        Self::new(
            result.documents.into_iter().next().unwrap_or_default(),
            result.metadatas.into_iter().next().unwrap_or_default(),
            result.distances.into_iter().next().unwrap_or_default(),
        )
    }

    /// Empty results carrying an error message.
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Iterate over `(document, metadata, distance)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metadata, f32)> {
        self.documents
            .iter()
            .zip(self.metadata.iter())
            .zip(self.distances.iter())
            .map(|((doc, meta), distance)| (doc.as_str(), meta, *distance))
    }
}
