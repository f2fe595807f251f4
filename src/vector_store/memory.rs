//! In-memory collection backend.
//!
//! Useful for testing and small datasets.

use super::{rank, CollectionBackend, Filter, QueryResult, Record};
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Collections = HashMap<String, Vec<Record>>;

/// In-memory collection backend. Records keep their insertion order.
pub struct MemoryBackend {
    collections: RwLock<Collections>,
}

impl MemoryBackend {
    /// Create a new in-memory backend.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| CourseRagError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| CourseRagError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        self.write()?.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.write()?.remove(collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()> {
        let mut collections = self.write()?;
        let stored = collections.entry(collection.to_string()).or_default();

        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<QueryResult> {
        let collections = self.read()?;
        let records = collections.get(collection).cloned().unwrap_or_default();
        Ok(QueryResult::single(rank(records, embedding, filter, limit)))
    }

    async fn get(&self, collection: &str, ids: Option<&[String]>) -> Result<Vec<Record>> {
        let collections = self.read()?;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| records.iter().find(|r| &r.id == id).cloned())
                .collect(),
            None => records.clone(),
        })
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.read()?.get(collection).map_or(0, Vec::len))
    }
}
