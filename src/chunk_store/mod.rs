//! Document chunk storage and similarity search.
//!
//! Provides a trait-based interface for different chunk store backends.

mod memory;
mod sqlite;

pub use memory::MemoryChunkStore;
pub use sqlite::SqliteChunkStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chunk of document text stored with its embedding.
///
/// Chunks are immutable once stored. Identity is `{document_id}_{chunk_index}`,
/// unique across all documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Document this chunk belongs to.
    pub document_id: String,
    /// Position of this chunk within the document.
    pub chunk_index: u32,
    /// Text content.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Source filename, carried through to answer citations.
    pub source: String,
    /// When this chunk was indexed.
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        document_id: String,
        chunk_index: u32,
        text: String,
        embedding: Vec<f32>,
        source: String,
    ) -> Self {
        Self {
            document_id,
            chunk_index,
            text,
            embedding,
            source,
            created_at: Utc::now(),
        }
    }

    /// Globally unique chunk identifier.
    pub fn chunk_id(&self) -> String {
        format!("{}_{}", self.document_id, self.chunk_index)
    }
}

/// A search result with similarity score.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity score (higher is better).
    pub score: f32,
}

/// Lifecycle of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Uploading => write!(f, "uploading"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Ready => write!(f, "ready"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(DocumentStatus::Uploading),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(format!("Unknown document status: {}", s)),
        }
    }
}

/// Metadata for an uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document ID.
    pub id: String,
    /// Original filename.
    pub filename: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// Processing status.
    pub status: DocumentStatus,
    /// When the document was uploaded.
    pub created_at: DateTime<Utc>,
}

/// Trait for chunk store implementations.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Bulk insert chunks.
    async fn upsert_batch(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Search for similar chunks restricted to the given documents.
    ///
    /// Results are ranked by similarity; ties are broken by original chunk
    /// order (document id, then chunk index).
    async fn search_scoped(
        &self,
        query_embedding: &[f32],
        document_ids: &[String],
        limit: usize,
    ) -> Result<Vec<ChunkHit>>;

    /// Get all chunks for a document, in chunk order.
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// Delete all chunks for a document.
    async fn delete_by_document(&self, document_id: &str) -> Result<usize>;

    /// Total number of stored chunks.
    async fn chunk_count(&self) -> Result<usize>;

    /// Create a document record.
    async fn insert_document(&self, doc: &DocumentRecord) -> Result<()>;

    /// Update a document's status and chunk count.
    async fn update_document(
        &self,
        document_id: &str,
        status: DocumentStatus,
        chunk_count: u32,
    ) -> Result<()>;

    /// Get a document record.
    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>>;

    /// Remove a document record.
    async fn delete_document(&self, document_id: &str) -> Result<()>;

    /// List all documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>>;
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

/// Rank hits by score, breaking ties by original chunk order.
pub(crate) fn rank_hits(mut hits: Vec<ChunkHit>, limit: usize) -> Vec<ChunkHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_chunk_id_format() {
        let chunk = Chunk::new(
            "doc_abc".to_string(),
            7,
            "content".to_string(),
            vec![],
            "paper.pdf".to_string(),
        );
        assert_eq!(chunk.chunk_id(), "doc_abc_7");
    }

    #[test]
    fn test_rank_hits_tie_broken_by_chunk_order() {
        let mk = |doc: &str, idx: u32, score: f32| ChunkHit {
            chunk: Chunk::new(doc.to_string(), idx, String::new(), vec![], String::new()),
            score,
        };

        let hits = vec![mk("doc_b", 0, 0.5), mk("doc_a", 3, 0.5), mk("doc_a", 1, 0.5)];
        let ranked = rank_hits(hits, 10);

        assert_eq!(ranked[0].chunk.chunk_id(), "doc_a_1");
        assert_eq!(ranked[1].chunk.chunk_id(), "doc_a_3");
        assert_eq!(ranked[2].chunk.chunk_id(), "doc_b_0");
    }
}
