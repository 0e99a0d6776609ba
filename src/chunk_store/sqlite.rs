//! SQLite-based chunk store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large corpora consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{
    cosine_similarity, rank_hits, Chunk, ChunkHit, ChunkStore, DocumentRecord, DocumentStatus,
};
use crate::error::{PodkastError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    source TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// SQLite-based chunk store.
pub struct SqliteChunkStore {
    conn: Mutex<Connection>,
}

impl SqliteChunkStore {
    /// Create a new SQLite chunk store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite chunk store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite chunk store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PodkastError::ChunkStore(format!("Failed to acquire lock: {}", e)))
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

    fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<Chunk> {
        let embedding_bytes: Vec<u8> = row.get("embedding")?;
        let created_at: String = row.get("created_at")?;

        Ok(Chunk {
            document_id: row.get("document_id")?,
            chunk_index: row.get("chunk_index")?,
            text: row.get("text")?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            source: row.get("source")?,
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
        let status: String = row.get("status")?;
        let created_at: String = row.get("created_at")?;

        Ok(DocumentRecord {
            id: row.get("id")?,
            filename: row.get("filename")?,
            chunk_count: row.get("chunk_count")?,
            status: status.parse().unwrap_or(DocumentStatus::Failed),
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert_batch(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                    (id, document_id, chunk_index, text, embedding, source, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    chunk.chunk_id(),
                    chunk.document_id,
                    chunk.chunk_index,
                    chunk.text,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.source,
                    chunk.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(chunks.len())
    }

    async fn search_scoped(
        &self,
        query_embedding: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ChunkHit>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;

        // Scan only the scoped documents; similarity is computed in Rust.
        let placeholders = vec!["?"; document_ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM chunks WHERE document_id IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(document_ids.iter()),
            Self::chunk_from_row,
        )?;

        let mut hits = Vec::new();
        for row in rows {
            let chunk = row?;
            let score = cosine_similarity(query_embedding, &chunk.embedding);
            hits.push(ChunkHit { chunk, score });
        }

        Ok(rank_hits(hits, limit))
    }

    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT * FROM chunks WHERE document_id = ?1 ORDER BY chunk_index ASC")?;
        let rows = stmt.query_map(params![document_id], Self::chunk_from_row)?;

        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row?);
        }
        Ok(chunks)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM chunks WHERE document_id = ?1",
            params![document_id],
        )?;
        Ok(deleted)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn insert_document(&self, doc: &DocumentRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO documents (id, filename, chunk_count, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                doc.id,
                doc.filename,
                doc.chunk_count,
                doc.status.to_string(),
                doc.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn update_document(
        &self,
        document_id: &str,
        status: DocumentStatus,
        chunk_count: u32,
    ) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE documents SET status = ?1, chunk_count = ?2 WHERE id = ?3",
            params![status.to_string(), chunk_count, document_id],
        )?;

        if updated == 0 {
            return Err(PodkastError::NotFound(format!("Document {}", document_id)));
        }
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![document_id], Self::document_from_row)?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![document_id],
        )?;

        if deleted == 0 {
            return Err(PodkastError::NotFound(format!("Document {}", document_id)));
        }
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM documents ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], Self::document_from_row)?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?);
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_chunk_store() {
        let store = SqliteChunkStore::in_memory().unwrap();

        let chunks = vec![
            Chunk::new(
                "doc_1".to_string(),
                0,
                "First chunk".to_string(),
                vec![1.0, 0.0],
                "a.pdf".to_string(),
            ),
            Chunk::new(
                "doc_1".to_string(),
                1,
                "Second chunk".to_string(),
                vec![0.0, 1.0],
                "a.pdf".to_string(),
            ),
            Chunk::new(
                "doc_2".to_string(),
                0,
                "Unrelated".to_string(),
                vec![1.0, 0.0],
                "b.pdf".to_string(),
            ),
        ];

        store.upsert_batch(&chunks).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 3);

        let hits = store
            .search_scoped(&[1.0, 0.0], &["doc_1".to_string()], 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "First chunk");

        let ordered = store.get_by_document("doc_1").await.unwrap();
        assert_eq!(ordered[0].chunk_index, 0);
        assert_eq!(ordered[1].chunk_index, 1);

        // Embeddings survive the blob round trip.
        assert_eq!(ordered[0].embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_search_empty_scope() {
        let store = SqliteChunkStore::in_memory().unwrap();
        let hits = store.search_scoped(&[1.0, 0.0], &[], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_document_rows() {
        let store = SqliteChunkStore::in_memory().unwrap();

        let doc = DocumentRecord {
            id: "doc_9".to_string(),
            filename: "report.pdf".to_string(),
            chunk_count: 0,
            status: DocumentStatus::Processing,
            created_at: Utc::now(),
        };
        store.insert_document(&doc).await.unwrap();
        store
            .update_document("doc_9", DocumentStatus::Ready, 4)
            .await
            .unwrap();

        let fetched = store.get_document("doc_9").await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Ready);
        assert_eq!(fetched.chunk_count, 4);
        assert!(store.get_document("nope").await.unwrap().is_none());

        store.delete_document("doc_9").await.unwrap();
        assert!(store.get_document("doc_9").await.unwrap().is_none());
        assert!(store.delete_document("doc_9").await.unwrap_err().is_not_found());
    }
}
