//! Vector store abstraction for course-rag.
//!
//! A [`CollectionBackend`] stores named collections of embedded records and answers
//! similarity queries. [`VectorStore`] layers the course catalog and course content
//! collections on top of it.

mod filter;
mod memory;
mod results;
mod sqlite;
mod store;

pub use filter::Filter;
pub use memory::MemoryBackend;
pub use results::SearchResults;
pub use sqlite::SqliteBackend;
pub use store::VectorStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection holding one record per course, keyed by title.
pub const COURSE_CATALOG: &str = "course_catalog";
/// Collection holding course content chunks.
pub const COURSE_CONTENT: &str = "course_content";

/// Metadata attached to a stored record.
pub type Metadata = serde_json::Map<String, Value>;

/// A document with its embedding, as stored in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// Raw result of a similarity query.
///
/// Each field holds one list per query text; backends in this crate always answer
/// a single query, so only the first batch is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Metadata>>,
    pub distances: Vec<Vec<f32>>,
}

impl QueryResult {
    /// Build a single-batch result from hits ordered by ascending distance.
    pub fn single(hits: Vec<(Record, f32)>) -> Self {
        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());

        for (record, distance) in hits {
            ids.push(record.id);
            documents.push(record.document);
            metadatas.push(record.metadata);
            distances.push(distance);
        }

        Self {
            ids: vec![ids],
            documents: vec![documents],
            metadatas: vec![metadatas],
            distances: vec![distances],
        }
    }
}

/// Trait for collection-oriented vector database backends.
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Create a collection if it does not exist yet.
    async fn create_collection(&self, collection: &str) -> Result<()>;

    /// Delete a collection and all its records.
    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Insert or replace records by id.
    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()>;

    /// Return the `limit` records nearest to `embedding` that match `filter`.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<QueryResult>;

    /// Fetch records by id, or every record when `ids` is `None`.
    async fn get(&self, collection: &str, ids: Option<&[String]>) -> Result<Vec<Record>>;

    /// Number of records in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance: 0.0 for identical direction, 1.0 for orthogonal vectors.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank records against a query embedding, nearest first.
pub(crate) fn rank(
    records: impl IntoIterator<Item = Record>,
    embedding: &[f32],
    filter: Option<&Filter>,
    limit: usize,
) -> Vec<(Record, f32)> {
    let mut hits: Vec<(Record, f32)> = records
        .into_iter()
        .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
        .map(|r| {
            let distance = cosine_distance(embedding, &r.embedding);
            (r, distance)
        })
        .collect();

    hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>, lesson: i64) -> Record {
        let mut metadata = Metadata::new();
        metadata.insert("lesson_number".to_string(), lesson.into());
        Record {
            id: id.to_string(),
            document: format!("doc {}", id),
            metadata,
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);
        assert!((cosine_distance(&a, &c) - 1.0).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rank_orders_filters_and_truncates() {
        let records = vec![
            record("far", vec![0.0, 1.0], 1),
            record("near", vec![1.0, 0.0], 1),
            record("mid", vec![1.0, 1.0], 1),
            record("other-lesson", vec![1.0, 0.0], 2),
        ];
        let filter = Filter::build(None, Some(1));

        let hits = rank(records, &[1.0, 0.0], filter.as_ref(), 2);
        let ids: Vec<_> = hits.iter().map(|(r, _)| r.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn test_query_result_single_batch() {
        let result = QueryResult::single(vec![(record("a", vec![1.0], 1), 0.25)]);
        assert_eq!(result.ids, vec![vec!["a".to_string()]]);
        assert_eq!(result.distances, vec![vec![0.25]]);
    }
}
