//! SQLite-based collection backend.
//!
//! Uses SQLite for persistence with cosine distance computed in Rust for simplicity.
//! The course catalog is small and content collections stay in the low thousands of
//! chunks, so a full scan per query is acceptable.

use super::{rank, CollectionBackend, Filter, Metadata, QueryResult, Record};
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    document TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, position);
"#;

/// SQLite-based collection backend.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) a database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite backend (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CourseRagError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn load_records(conn: &Connection, collection: &str) -> Result<Vec<Record>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, document, metadata, embedding
            FROM records
            WHERE collection = ?1
            ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map(params![collection], |row| {
            let id: String = row.get(0)?;
            let document: String = row.get(1)?;
            let metadata: String = row.get(2)?;
            let embedding: Vec<u8> = row.get(3)?;
            Ok((id, document, metadata, embedding))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, document, metadata, embedding) = row?;
            let metadata: Metadata = serde_json::from_str(&metadata)?;
            records.push(Record {
                id,
                document,
                metadata,
                embedding: Self::bytes_to_embedding(&embedding),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl CollectionBackend for SqliteBackend {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
            params![collection],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute("DELETE FROM records WHERE collection = ?1", params![collection])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![collection])?;
        tx.commit()?;

        info!("Deleted collection {} ({} records)", collection, deleted);
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
            params![collection],
        )?;

        let mut next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;

        for record in records {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT position FROM records WHERE collection = ?1 AND id = ?2",
                    params![collection, record.id],
                    |row| row.get(0),
                )
                .optional()?;

            let position = match existing {
                Some(position) => position,
                None => {
                    next_position += 1;
                    next_position - 1
                }
            };

            tx.execute(
                r#"
                INSERT OR REPLACE INTO records
                (collection, id, document, metadata, embedding, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    collection,
                    record.id,
                    record.document,
                    serde_json::to_string(&record.metadata)?,
                    Self::embedding_to_bytes(&record.embedding),
                    position,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Upserted {} records into {}", records.len(), collection);
        Ok(())
    }

    #[instrument(skip(self, embedding, filter))]
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<QueryResult> {
        let conn = self.lock()?;
        let records = Self::load_records(&conn, collection)?;
        let hits = rank(records, embedding, filter, limit);

        debug!("Found {} matching records in {}", hits.len(), collection);
        Ok(QueryResult::single(hits))
    }

    async fn get(&self, collection: &str, ids: Option<&[String]>) -> Result<Vec<Record>> {
        let conn = self.lock()?;
        let records = Self::load_records(&conn, collection)?;

        Ok(match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| records.iter().find(|r| &r.id == id).cloned())
                .collect(),
            None => records,
        })
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
