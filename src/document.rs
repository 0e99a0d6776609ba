//! Document ingestion: upload, extraction, chunking, indexing.
//!
//! A document moves `uploading -> processing -> ready|failed`. Only `ready`
//! documents can feed podcast generation. Chunk ids embed the document id, so
//! concurrent uploads never collide in the chunk store.

use crate::chunk_store::{Chunk, ChunkStore, DocumentRecord, DocumentStatus};
use crate::chunking::chunk_text;
use crate::embedding::Embedder;
use crate::error::{PodkastError, Result};
use crate::extract::TextExtractor;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Processes uploaded documents into indexed, searchable chunks.
pub struct DocumentProcessor {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    chunk_store: Arc<dyn ChunkStore>,
    upload_dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentProcessor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        chunk_store: Arc<dyn ChunkStore>,
        upload_dir: PathBuf,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            extractor,
            embedder,
            chunk_store,
            upload_dir,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Ingest an uploaded file and index its chunks.
    ///
    /// Returns the `ready` document record on success. Extraction or indexing
    /// failures mark the document `failed` before the error propagates, so a
    /// later status lookup tells the same story as the upload response.
    #[instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn process_upload(&self, filename: &str, bytes: &[u8]) -> Result<DocumentRecord> {
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(PodkastError::InvalidInput(format!(
                "Only PDF files are supported, got: {}",
                filename
            )));
        }

        let document_id = format!("doc_{}", Uuid::new_v4().simple());

        self.chunk_store
            .insert_document(&DocumentRecord {
                id: document_id.clone(),
                filename: filename.to_string(),
                chunk_count: 0,
                status: DocumentStatus::Uploading,
                created_at: Utc::now(),
            })
            .await?;

        // Keep the original upload for reprocessing or debugging.
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::write(self.upload_dir.join(format!("{}.pdf", document_id)), bytes)?;

        self.chunk_store
            .update_document(&document_id, DocumentStatus::Processing, 0)
            .await?;

        match self.index(&document_id, filename, bytes).await {
            Ok(chunk_count) => {
                self.chunk_store
                    .update_document(&document_id, DocumentStatus::Ready, chunk_count)
                    .await?;

                info!("Document {} ready with {} chunks", document_id, chunk_count);

                Ok(DocumentRecord {
                    id: document_id,
                    filename: filename.to_string(),
                    chunk_count,
                    status: DocumentStatus::Ready,
                    created_at: Utc::now(),
                })
            }
            Err(e) => {
                error!("Document {} processing failed: {}", document_id, e);
                self.chunk_store
                    .update_document(&document_id, DocumentStatus::Failed, 0)
                    .await?;
                Err(e)
            }
        }
    }

    async fn index(&self, document_id: &str, filename: &str, bytes: &[u8]) -> Result<u32> {
        let text = self.extractor.extract(filename, bytes)?;
        let pieces = chunk_text(&text, self.chunk_size, self.chunk_overlap);

        if pieces.is_empty() {
            return Err(PodkastError::InvalidInput(format!(
                "No text could be extracted from {}",
                filename
            )));
        }

        let embeddings = self.embedder.embed_batch(&pieces).await?;

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| {
                Chunk::new(
                    document_id.to_string(),
                    i as u32,
                    text,
                    embedding,
                    filename.to_string(),
                )
            })
            .collect();

        let count = self.chunk_store.upsert_batch(&chunks).await?;
        Ok(count as u32)
    }

    /// Remove a document: its record, its indexed chunks, and the stored
    /// upload. A deleted id is gone for good; later lookups and generation
    /// requests treat it as unknown.
    pub async fn delete(&self, document_id: &str) -> Result<()> {
        if self.chunk_store.get_document(document_id).await?.is_none() {
            return Err(PodkastError::NotFound(format!("Document {}", document_id)));
        }

        self.chunk_store.delete_by_document(document_id).await?;
        self.chunk_store.delete_document(document_id).await?;

        let upload = self.upload_dir.join(format!("{}.pdf", document_id));
        if upload.exists() {
            std::fs::remove_file(upload)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_store::MemoryChunkStore;
    use crate::extract::PlainTextExtractor;

    struct ZeroEmbedder;

    #[async_trait::async_trait]
    impl Embedder for ZeroEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn processor(dir: &std::path::Path) -> (DocumentProcessor, Arc<MemoryChunkStore>) {
        let chunk_store = Arc::new(MemoryChunkStore::new());
        let processor = DocumentProcessor::new(
            Arc::new(PlainTextExtractor),
            Arc::new(ZeroEmbedder),
            chunk_store.clone(),
            dir.to_path_buf(),
            500,
            50,
        );
        (processor, chunk_store)
    }

    #[tokio::test]
    async fn test_upload_reaches_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (processor, chunk_store) = processor(dir.path());

        let content = "Lorem ipsum dolor sit amet. ".repeat(60);
        let doc = processor
            .process_upload("notes.pdf", content.as_bytes())
            .await
            .unwrap();

        assert_eq!(doc.status, DocumentStatus::Ready);
        assert!(doc.chunk_count > 1);

        let stored = chunk_store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Ready);
        assert_eq!(stored.chunk_count, doc.chunk_count);

        let chunks = chunk_store.get_by_document(&doc.id).await.unwrap();
        assert_eq!(chunks.len() as u32, doc.chunk_count);
        assert_eq!(chunks[0].source, "notes.pdf");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let (processor, _) = processor(dir.path());

        let err = processor
            .process_upload("notes.docx", b"whatever")
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_failed_extraction_marks_document_failed() {
        let dir = tempfile::tempdir().unwrap();
        let (processor, chunk_store) = processor(dir.path());

        // Too short for the extractor's minimum.
        let err = processor.process_upload("tiny.pdf", b"hi").await.unwrap_err();
        assert!(err.is_invalid_input());

        let docs = chunk_store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].status, DocumentStatus::Failed);
    }

    #[tokio::test]
    async fn test_delete_removes_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (processor, chunk_store) = processor(dir.path());

        let content = "Some reasonable document content here. ".repeat(30);
        let doc = processor
            .process_upload("gone.pdf", content.as_bytes())
            .await
            .unwrap();

        processor.delete(&doc.id).await.unwrap();
        assert!(chunk_store.get_by_document(&doc.id).await.unwrap().is_empty());
        // The record is gone too, so the id no longer resolves anywhere.
        assert!(chunk_store.get_document(&doc.id).await.unwrap().is_none());
        assert!(chunk_store.list_documents().await.unwrap().is_empty());

        assert!(processor.delete("doc_missing").await.unwrap_err().is_not_found());
    }
}
