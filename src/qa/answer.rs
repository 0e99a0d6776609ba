//! Answer generation for listener questions.

use super::QaContext;
use crate::audio;
use crate::config::Prompts;
use crate::error::{PodkastError, Result};
use crate::store::{PodcastStore, QuestionRecord};
use crate::tts::SpeechSynthesizer;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A generated answer to a listener question.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Identifier of the recorded question.
    pub question_id: String,
    pub question: String,
    pub answer_text: String,
    /// Distinct source filenames the answer drew on, in retrieval order.
    pub sources: Vec<String>,
    /// How many recent dialogue lines informed the answer.
    pub dialogue_lines_used: usize,
    /// How many document chunks informed the answer.
    pub chunks_used: usize,
    /// Path to the synthesized answer audio, when voice answers are enabled
    /// and synthesis succeeded.
    pub audio_path: Option<PathBuf>,
}

/// Generates spoken-style answers from a [`QaContext`].
pub struct QuestionAnswerer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
    store: Arc<PodcastStore>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    host_voice: String,
    answer_dir: PathBuf,
}

impl QuestionAnswerer {
    pub fn new(
        model: &str,
        store: Arc<PodcastStore>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        host_voice: &str,
        answer_dir: PathBuf,
    ) -> Self {
        Self {
            client: crate::openai::create_client(),
            model: model.to_string(),
            prompts: Prompts::default(),
            store,
            synthesizer,
            host_voice: host_voice.to_string(),
            answer_dir,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PodkastError::OpenAI(e.to_string()))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .build()
            .map_err(|e| PodkastError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PodkastError::OpenAI(format!("Answer generation failed: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| PodkastError::OpenAI("Empty answer from LLM".to_string()))
    }

    /// Answer a question using the assembled context.
    ///
    /// The text answer is authoritative; answer audio and the persisted
    /// question record are best-effort and never fail the request.
    #[instrument(skip(self, context, question), fields(podcast_id = %context.podcast.id))]
    pub async fn answer(
        &self,
        context: &QaContext,
        question: &str,
        timestamp: f64,
    ) -> Result<Answer> {
        let mut vars = HashMap::new();
        vars.insert("dialogue".to_string(), context.dialogue_block());
        vars.insert("chunks".to_string(), context.chunks_block());
        vars.insert("question".to_string(), question.to_string());

        let prompt = Prompts::render(&self.prompts.answer.answer, &vars);
        let answer_text = self.complete(prompt).await?;

        let question_id = format!("q_{}", Uuid::new_v4().simple());

        let audio_path = match &self.synthesizer {
            Some(synth) => {
                match synth.synthesize(&answer_text, &self.host_voice).await {
                    Ok(bytes) => {
                        let filename = format!("{}.mp3", question_id);
                        match audio::write_clip(&self.answer_dir, &filename, &bytes) {
                            Ok(path) => Some(path),
                            Err(e) => {
                                warn!("Failed to write answer audio: {}", e);
                                None
                            }
                        }
                    }
                    Err(e) => {
                        // Text answers still work when TTS is down.
                        warn!("Answer audio synthesis failed: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let record = QuestionRecord {
            id: question_id.clone(),
            podcast_id: context.podcast.id.clone(),
            question_text: question.to_string(),
            answer_text: answer_text.clone(),
            timestamp,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.record_question(&record) {
            warn!("Failed to record question {}: {}", question_id, e);
        }

        info!(
            "Answered question {} with {} dialogue lines and {} chunks",
            question_id,
            context.recent_dialogue.len(),
            context.chunks.len()
        );

        Ok(Answer {
            question_id,
            question: question.to_string(),
            answer_text,
            sources: dedup_sources(context),
            dialogue_lines_used: context.recent_dialogue.len(),
            chunks_used: context.chunks.len(),
            audio_path,
        })
    }
}

/// Distinct source filenames in retrieval order.
fn dedup_sources(context: &QaContext) -> Vec<String> {
    let mut sources = Vec::new();
    for hit in &context.chunks {
        if !sources.contains(&hit.chunk.source) {
            sources.push(hit.chunk.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_store::{Chunk, ChunkHit};
    use crate::job::PodcastJob;

    fn hit(source: &str, idx: u32, score: f32) -> ChunkHit {
        ChunkHit {
            chunk: Chunk::new(
                "doc_1".to_string(),
                idx,
                "text".to_string(),
                vec![],
                source.to_string(),
            ),
            score,
        }
    }

    #[test]
    fn test_dedup_sources_preserves_order() {
        let context = QaContext {
            podcast: PodcastJob::new("pod_1".to_string(), vec![], "t".to_string(), 3),
            recent_dialogue: vec![],
            chunks: vec![
                hit("b.pdf", 0, 0.9),
                hit("a.pdf", 1, 0.8),
                hit("b.pdf", 2, 0.7),
            ],
        };

        assert_eq!(dedup_sources(&context), vec!["b.pdf", "a.pdf"]);
    }
}
