//! Question context assembly.
//!
//! Input validation happens here, before any embedding or retrieval work, so
//! a bad request never costs an API call.

use crate::chunk_store::{ChunkHit, ChunkStore};
use crate::embedding::Embedder;
use crate::error::{PodkastError, Result};
use crate::job::{JobStatus, PodcastJob};
use crate::script::{self, ScriptExchange, Speaker};
use crate::store::PodcastStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One line of recently played dialogue.
#[derive(Debug, Clone)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
    /// Estimated start of the line, in seconds from podcast start.
    pub timestamp: f64,
}

/// Everything needed to answer a listener question.
#[derive(Debug, Clone)]
pub struct QaContext {
    pub podcast: PodcastJob,
    /// Dialogue lines estimated to have played within the lookback window.
    pub recent_dialogue: Vec<DialogueLine>,
    /// Source-document chunks most similar to the question.
    pub chunks: Vec<ChunkHit>,
}

impl QaContext {
    /// Format the recent dialogue for prompt insertion.
    pub fn dialogue_block(&self) -> String {
        if self.recent_dialogue.is_empty() {
            return "(no recent dialogue)".to_string();
        }
        self.recent_dialogue
            .iter()
            .map(|line| {
                let who = match line.speaker {
                    Speaker::Host => "Host",
                    Speaker::Guest => "Guest",
                };
                format!("{}: {}", who, line.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format the retrieved chunks for prompt insertion.
    pub fn chunks_block(&self) -> String {
        if self.chunks.is_empty() {
            return "(no relevant source material found)".to_string();
        }
        self.chunks
            .iter()
            .map(|hit| format!("[{}]\n{}", hit.chunk.source, hit.chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Builds [`QaContext`] for a question asked at a playback position.
pub struct QaContextBuilder {
    store: Arc<PodcastStore>,
    chunk_store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    podcast_dir: PathBuf,
    lookback_seconds: f64,
    max_context_chunks: usize,
}

impl QaContextBuilder {
    pub fn new(
        store: Arc<PodcastStore>,
        chunk_store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        podcast_dir: PathBuf,
        lookback_seconds: f64,
        max_context_chunks: usize,
    ) -> Self {
        Self {
            store,
            chunk_store,
            embedder,
            podcast_dir,
            lookback_seconds,
            max_context_chunks,
        }
    }

    /// Validate the request and assemble the answering context.
    #[instrument(skip(self, question), fields(podcast_id = %podcast_id, timestamp))]
    pub async fn build(
        &self,
        podcast_id: &str,
        question: &str,
        timestamp: f64,
    ) -> Result<QaContext> {
        if question.trim().is_empty() {
            return Err(PodkastError::EmptyQuestion);
        }
        if timestamp < 0.0 || !timestamp.is_finite() {
            return Err(PodkastError::InvalidTimestamp(timestamp));
        }

        let podcast = self
            .store
            .get_podcast(podcast_id)?
            .ok_or_else(|| PodkastError::NotFound(format!("Podcast {}", podcast_id)))?;

        if podcast.status != JobStatus::Complete {
            return Err(PodkastError::InvalidInput(format!(
                "Podcast {} is not ready for questions (status: {})",
                podcast_id, podcast.status
            )));
        }

        let exchanges = script::load_script(&self.podcast_dir, podcast_id)?;
        let recent_dialogue = dialogue_window(&exchanges, timestamp, self.lookback_seconds);

        debug!(
            "Dialogue window at {:.1}s holds {} of {} lines",
            timestamp,
            recent_dialogue.len(),
            exchanges.len()
        );

        let query_embedding = self.embedder.embed(question).await?;
        let chunks = self
            .chunk_store
            .search_scoped(&query_embedding, &podcast.document_ids, self.max_context_chunks)
            .await?;

        Ok(QaContext {
            podcast,
            recent_dialogue,
            chunks,
        })
    }
}

/// Lines estimated to have played within `lookback_seconds` before `timestamp`.
///
/// Positions past the end of the script are clamped to the final line's start,
/// so late questions still see the closing dialogue.
fn dialogue_window(
    exchanges: &[ScriptExchange],
    timestamp: f64,
    lookback_seconds: f64,
) -> Vec<DialogueLine> {
    let Some(last) = exchanges.last() else {
        return Vec::new();
    };

    let position = timestamp.min(last.estimated_start_seconds);
    let window_start = position - lookback_seconds;

    exchanges
        .iter()
        .filter(|e| {
            e.estimated_start_seconds >= window_start && e.estimated_start_seconds <= position
        })
        .map(|e| DialogueLine {
            speaker: e.speaker,
            text: e.text.clone(),
            timestamp: e.estimated_start_seconds,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_store::{Chunk, DocumentRecord, DocumentStatus, MemoryChunkStore};
    use crate::job::JobStage;
    use crate::script::assign_start_times;
    use async_trait::async_trait;
    use chrono::Utc;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn make_exchanges(count: usize) -> Vec<ScriptExchange> {
        let mut exchanges: Vec<ScriptExchange> = (0..count)
            .map(|i| ScriptExchange {
                index: i as u32,
                speaker: if i % 2 == 0 { Speaker::Host } else { Speaker::Guest },
                text: format!("Line {}", i),
                estimated_start_seconds: 0.0,
            })
            .collect();
        assign_start_times(&mut exchanges, 8.0);
        exchanges
    }

    #[test]
    fn test_window_at_start() {
        // At t=0 only the opening line has started.
        let window = dialogue_window(&make_exchanges(20), 0.0, 60.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].text, "Line 0");
    }

    #[test]
    fn test_window_empty_before_first_line() {
        // A cold open: the first line starts at 10s, so a question at t=0
        // has no played dialogue behind it.
        let mut exchanges = make_exchanges(5);
        for exchange in &mut exchanges {
            exchange.estimated_start_seconds += 10.0;
        }

        assert!(dialogue_window(&exchanges, 0.0, 60.0).is_empty());
        // The window opens as soon as the first line starts.
        assert_eq!(dialogue_window(&exchanges, 10.0, 60.0).len(), 1);
    }

    #[test]
    fn test_window_mid_podcast() {
        // t=100 with 8s lines: starts in [40, 100] are lines 5..=12.
        let window = dialogue_window(&make_exchanges(20), 100.0, 60.0);
        assert_eq!(window.len(), 8);
        assert_eq!(window.first().unwrap().text, "Line 5");
        assert_eq!(window.last().unwrap().text, "Line 12");
    }

    #[test]
    fn test_window_clamps_past_end() {
        // 20 lines end at start 152s; t=10000 clamps there and still
        // returns the closing dialogue.
        let window = dialogue_window(&make_exchanges(20), 10_000.0, 60.0);
        assert!(!window.is_empty());
        assert_eq!(window.last().unwrap().text, "Line 19");
        assert_eq!(window.first().unwrap().timestamp, 96.0);
    }

    #[test]
    fn test_window_empty_script() {
        assert!(dialogue_window(&[], 30.0, 60.0).is_empty());
    }

    async fn builder_fixture(
        dir: &std::path::Path,
        status: JobStatus,
    ) -> (QaContextBuilder, String) {
        let store = Arc::new(PodcastStore::open_in_memory().unwrap());
        let chunk_store = Arc::new(MemoryChunkStore::new());

        chunk_store
            .insert_document(&DocumentRecord {
                id: "doc_1".to_string(),
                filename: "paper.pdf".to_string(),
                chunk_count: 2,
                status: DocumentStatus::Ready,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        chunk_store
            .upsert_batch(&[
                Chunk::new("doc_1".to_string(), 0, "Alpha".to_string(), vec![1.0, 0.0], "paper.pdf".to_string()),
                Chunk::new("doc_1".to_string(), 1, "Beta".to_string(), vec![0.0, 1.0], "paper.pdf".to_string()),
            ])
            .await
            .unwrap();

        let mut job = PodcastJob::new(
            "pod_1".to_string(),
            vec!["doc_1".to_string()],
            "topic".to_string(),
            3,
        );
        job.status = status;
        if status == JobStatus::Complete {
            job.stage = JobStage::Done;
        }
        store.save_podcast(&job).unwrap();

        script::save_script(dir, "pod_1", &make_exchanges(10)).unwrap();

        let builder = QaContextBuilder::new(
            store,
            chunk_store,
            Arc::new(UnitEmbedder),
            dir.to_path_buf(),
            60.0,
            5,
        );
        (builder, "pod_1".to_string())
    }

    #[tokio::test]
    async fn test_build_context() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, id) = builder_fixture(dir.path(), JobStatus::Complete).await;

        let ctx = builder.build(&id, "What is alpha?", 30.0).await.unwrap();
        assert!(!ctx.recent_dialogue.is_empty());
        assert_eq!(ctx.chunks.len(), 2);
        // Most similar chunk first.
        assert_eq!(ctx.chunks[0].chunk.text, "Alpha");
        assert!(ctx.dialogue_block().contains("Host: Line 0"));
        assert!(ctx.chunks_block().contains("[paper.pdf]"));
    }

    #[tokio::test]
    async fn test_build_validates_before_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, id) = builder_fixture(dir.path(), JobStatus::Complete).await;

        let err = builder.build(&id, "   ", 30.0).await.unwrap_err();
        assert!(matches!(err, PodkastError::EmptyQuestion));

        let err = builder.build(&id, "Why?", -1.0).await.unwrap_err();
        assert!(matches!(err, PodkastError::InvalidTimestamp(_)));

        let err = builder.build("pod_missing", "Why?", 30.0).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_build_rejects_unfinished_podcast() {
        let dir = tempfile::tempdir().unwrap();
        let (builder, id) = builder_fixture(dir.path(), JobStatus::Processing).await;

        let err = builder.build(&id, "Why?", 30.0).await.unwrap_err();
        assert!(err.is_invalid_input());
    }
}
