//! In-memory chunk store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_similarity, rank_hits, Chunk, ChunkHit, ChunkStore, DocumentRecord, DocumentStatus,
};
use crate::error::{PodkastError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory chunk store.
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<String, Chunk>>,
    documents: RwLock<HashMap<String, DocumentRecord>>,
}

impl MemoryChunkStore {
    /// Create a new in-memory chunk store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            documents: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert_batch(&self, chunks: &[Chunk]) -> Result<usize> {
        let mut store = self.chunks.write().unwrap();
        for chunk in chunks {
            store.insert(chunk.chunk_id(), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn search_scoped(
        &self,
        query_embedding: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ChunkHit>> {
        let chunks = self.chunks.read().unwrap();

        let hits: Vec<ChunkHit> = chunks
            .values()
            .filter(|c| document_ids.contains(&c.document_id))
            .map(|chunk| ChunkHit {
                chunk: chunk.clone(),
                score: cosine_similarity(query_embedding, &chunk.embedding),
            })
            .collect();

        Ok(rank_hits(hits, limit))
    }

    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let chunks = self.chunks.read().unwrap();
        let mut result: Vec<Chunk> = chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.chunk_index);
        Ok(result)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        let initial_len = chunks.len();
        chunks.retain(|_, c| c.document_id != document_id);
        Ok(initial_len - chunks.len())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks.len())
    }

    async fn insert_document(&self, doc: &DocumentRecord) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        document_id: &str,
        status: DocumentStatus,
        chunk_count: u32,
    ) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        let doc = documents
            .get_mut(document_id)
            .ok_or_else(|| PodkastError::NotFound(format!("Document {}", document_id)))?;
        doc.status = status;
        doc.chunk_count = chunk_count;
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let documents = self.documents.read().unwrap();
        Ok(documents.get(document_id).cloned())
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        documents
            .remove(document_id)
            .ok_or_else(|| PodkastError::NotFound(format!("Document {}", document_id)))?;
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let documents = self.documents.read().unwrap();
        let mut result: Vec<DocumentRecord> = documents.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_chunk_store() {
        let store = MemoryChunkStore::new();

        let c1 = Chunk::new(
            "doc_1".to_string(),
            0,
            "Hello world".to_string(),
            vec![1.0, 0.0, 0.0],
            "a.pdf".to_string(),
        );
        let c2 = Chunk::new(
            "doc_1".to_string(),
            1,
            "Goodbye world".to_string(),
            vec![0.0, 1.0, 0.0],
            "a.pdf".to_string(),
        );
        let c3 = Chunk::new(
            "doc_2".to_string(),
            0,
            "Other document".to_string(),
            vec![1.0, 0.0, 0.0],
            "b.pdf".to_string(),
        );

        store.upsert_batch(&[c1, c2, c3]).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 3);

        // Scoped search only sees doc_1.
        let hits = store
            .search_scoped(&[1.0, 0.0, 0.0], &["doc_1".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.document_id, "doc_1");
        assert!(hits[0].score > hits[1].score);

        let by_doc = store.get_by_document("doc_1").await.unwrap();
        assert_eq!(by_doc.len(), 2);
        assert_eq!(by_doc[0].chunk_index, 0);

        assert_eq!(store.delete_by_document("doc_1").await.unwrap(), 2);
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let store = MemoryChunkStore::new();

        let doc = DocumentRecord {
            id: "doc_1".to_string(),
            filename: "a.pdf".to_string(),
            chunk_count: 0,
            status: DocumentStatus::Uploading,
            created_at: Utc::now(),
        };
        store.insert_document(&doc).await.unwrap();

        store
            .update_document("doc_1", DocumentStatus::Ready, 12)
            .await
            .unwrap();

        let fetched = store.get_document("doc_1").await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Ready);
        assert_eq!(fetched.chunk_count, 12);

        let err = store
            .update_document("missing", DocumentStatus::Ready, 0)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        store.delete_document("doc_1").await.unwrap();
        assert!(store.get_document("doc_1").await.unwrap().is_none());
        assert!(store.delete_document("doc_1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_chunk_ids_unique_across_documents() {
        let store = MemoryChunkStore::new();

        let chunks: Vec<Chunk> = (0..3)
            .flat_map(|d| {
                (0..4).map(move |i| {
                    Chunk::new(
                        format!("doc_{}", d),
                        i,
                        format!("chunk {} of doc {}", i, d),
                        vec![0.1; 3],
                        "f.pdf".to_string(),
                    )
                })
            })
            .collect();

        let ids: std::collections::HashSet<String> =
            chunks.iter().map(|c| c.chunk_id()).collect();
        assert_eq!(ids.len(), chunks.len());

        store.upsert_batch(&chunks).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), chunks.len());
    }
}
