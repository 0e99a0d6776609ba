//! The asynchronous podcast generation pipeline.
//!
//! `submit` validates the request, atomically registers the job, spawns the
//! pipeline task, and returns immediately; clients poll `status` until the
//! job is terminal. Each stage transition is one atomic registry update
//! mirrored to the persistent store, so pollers always see a consistent
//! snapshot and stages never regress. Failures at any stage mark the job
//! failed and halt; retries live in the call adapters, not here.

use crate::audio;
use crate::chunk_store::{ChunkStore, DocumentStatus, SqliteChunkStore};
use crate::config::Settings;
use crate::error::{PodkastError, Result};
use crate::job::{JobRegistry, JobStage, JobStatus, PodcastJob};
use crate::script::{
    self, assign_start_times, estimated_duration_seconds, parse_dialogue, DialogueGenerator,
    OpenAiDialogueGenerator,
};
use crate::store::PodcastStore;
use crate::tts::{ElevenLabsSynthesizer, SpeechSynthesizer, VoiceConfig};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Drives podcast generation jobs from submission to completion.
pub struct PodcastGenerator {
    chunk_store: Arc<dyn ChunkStore>,
    dialogue: Arc<dyn DialogueGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    registry: Arc<JobRegistry>,
    store: Arc<PodcastStore>,
    voices: VoiceConfig,
    podcast_dir: PathBuf,
    seconds_per_exchange: f64,
    pause_ms: u64,
    chunks_per_document: usize,
}

impl PodcastGenerator {
    /// Create a generator with default (network-backed) components.
    pub fn new(settings: Settings) -> Result<Self> {
        let chunk_store = Arc::new(SqliteChunkStore::new(&settings.sqlite_path())?);
        let dialogue = Arc::new(OpenAiDialogueGenerator::new(
            &settings.script.model,
            settings.script.max_input_tokens,
            settings.script.words_per_minute,
        ));
        let synthesizer = Arc::new(ElevenLabsSynthesizer::from_env(
            &settings.audio.tts_model,
            Duration::from_secs(settings.audio.request_timeout_seconds),
            settings.audio.max_retries,
        )?);
        let store = Arc::new(PodcastStore::open(&settings.sqlite_path())?);

        Ok(Self::with_components(
            chunk_store,
            dialogue,
            synthesizer,
            store,
            &settings,
        ))
    }

    /// Create a generator with custom components.
    pub fn with_components(
        chunk_store: Arc<dyn ChunkStore>,
        dialogue: Arc<dyn DialogueGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: Arc<PodcastStore>,
        settings: &Settings,
    ) -> Self {
        Self {
            chunk_store,
            dialogue,
            synthesizer,
            registry: Arc::new(JobRegistry::new()),
            store,
            voices: VoiceConfig {
                host: settings.audio.host_voice.clone(),
                guest: settings.audio.guest_voice.clone(),
            },
            podcast_dir: settings.podcast_dir(),
            seconds_per_exchange: settings.playback.seconds_per_exchange,
            pause_ms: settings.audio.pause_ms,
            chunks_per_document: settings.script.chunks_per_document,
        }
    }

    /// The chunk store backing this generator.
    pub fn chunk_store(&self) -> Arc<dyn ChunkStore> {
        self.chunk_store.clone()
    }

    /// The persistent metadata store.
    pub fn store(&self) -> Arc<PodcastStore> {
        self.store.clone()
    }

    /// Directory holding generated audio and script artifacts.
    pub fn podcast_dir(&self) -> &PathBuf {
        &self.podcast_dir
    }

    /// Submit a generation request. Returns the job id immediately; the
    /// pipeline runs as an independent task.
    #[instrument(skip(self), fields(docs = document_ids.len(), topic = %topic))]
    pub async fn submit(
        self: &Arc<Self>,
        document_ids: &[String],
        topic: &str,
        duration_minutes: u32,
    ) -> Result<String> {
        if document_ids.is_empty() {
            return Err(PodkastError::InvalidInput(
                "document_ids cannot be empty".to_string(),
            ));
        }
        if duration_minutes == 0 {
            return Err(PodkastError::InvalidInput(
                "duration_minutes must be positive".to_string(),
            ));
        }

        for id in document_ids {
            match self.chunk_store.get_document(id).await? {
                Some(doc) if doc.status == DocumentStatus::Ready => {}
                Some(doc) => {
                    return Err(PodkastError::InvalidInput(format!(
                        "Document {} is not ready (status: {})",
                        id, doc.status
                    )));
                }
                None => {
                    return Err(PodkastError::InvalidInput(format!(
                        "Unknown document: {}",
                        id
                    )));
                }
            }
        }

        let job_id = format!("pod_{}", Uuid::new_v4().simple());
        let job = PodcastJob::new(
            job_id.clone(),
            document_ids.to_vec(),
            topic.to_string(),
            duration_minutes,
        );

        // Registering the row before spawning guarantees at most one
        // pipeline run per job id.
        self.registry.create(job.clone())?;
        self.store.save_podcast(&job)?;

        info!("Submitted podcast job {}", job_id);

        let this = Arc::clone(self);
        let id = job_id.clone();
        tokio::spawn(async move {
            this.run_pipeline(&id).await;
        });

        Ok(job_id)
    }

    /// Read the latest committed job snapshot. Never blocks a running job.
    pub async fn status(&self, job_id: &str) -> Result<PodcastJob> {
        if let Some(job) = self.registry.get(job_id) {
            return Ok(job);
        }
        // Jobs from a previous process live only in the store.
        self.store
            .get_podcast(job_id)?
            .ok_or_else(|| PodkastError::NotFound(format!("Podcast {}", job_id)))
    }

    /// All known jobs, newest first.
    pub async fn list(&self) -> Result<Vec<PodcastJob>> {
        let mut jobs = self.store.list_podcasts()?;
        // Running jobs may be a transition ahead of the persisted mirror.
        for job in jobs.iter_mut() {
            if let Some(live) = self.registry.get(&job.id) {
                *job = live;
            }
        }
        Ok(jobs)
    }

    /// Commit a job mutation: one atomic registry update, mirrored to sqlite.
    fn commit<F>(&self, job_id: &str, mutate: F) -> Result<PodcastJob>
    where
        F: FnOnce(&mut PodcastJob),
    {
        let snapshot = self.registry.update(job_id, mutate)?;
        self.store.save_podcast(&snapshot)?;
        Ok(snapshot)
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn run_pipeline(&self, job_id: &str) {
        if let Err(e) = self.run_stages(job_id).await {
            error!("Podcast job {} failed: {}", job_id, e);
            let result = self.commit(job_id, |job| {
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                job.failed_at = Some(Utc::now());
            });
            if let Err(commit_err) = result {
                error!("Failed to record failure for job {}: {}", job_id, commit_err);
            }
        }
    }

    async fn run_stages(&self, job_id: &str) -> Result<()> {
        let job = self
            .registry
            .get(job_id)
            .ok_or_else(|| PodkastError::NotFound(format!("Job {}", job_id)))?;

        // Stage 1: retrieve source chunks, top N per document.
        let mut content_parts = Vec::new();
        for document_id in &job.document_ids {
            let chunks = self.chunk_store.get_by_document(document_id).await?;
            for chunk in chunks.into_iter().take(self.chunks_per_document) {
                content_parts.push(chunk.text);
            }
        }

        if content_parts.is_empty() {
            return Err(PodkastError::ScriptGeneration(
                "No content found in the selected documents".to_string(),
            ));
        }

        let combined_content = content_parts.join("\n\n");
        self.commit(job_id, |j| {
            j.stage = JobStage::GeneratingScript;
            j.progress_percent = 15;
        })?;

        // Stage 2: generate and parse the dialogue script.
        let dialogue_text = self
            .dialogue
            .generate_dialogue(&job.topic, &combined_content, job.target_duration_minutes)
            .await?;

        let mut exchanges = parse_dialogue(&dialogue_text)?;
        assign_start_times(&mut exchanges, self.seconds_per_exchange);
        script::save_script(&self.podcast_dir, job_id, &exchanges)?;

        let script_file = script::script_path(&self.podcast_dir, job_id);
        self.commit(job_id, |j| {
            j.stage = JobStage::GeneratingAudio;
            j.progress_percent = 40;
            j.script_path = Some(script_file.to_string_lossy().into_owned());
        })?;

        info!(
            "Job {}: script ready with {} exchanges, synthesizing audio",
            job_id,
            exchanges.len()
        );

        // Stage 3: synthesize each exchange with the speaker's voice.
        let total = exchanges.len();
        let mut segments = Vec::with_capacity(total);
        for (i, exchange) in exchanges.iter().enumerate() {
            let voice = self.voices.voice_for(exchange.speaker);
            let segment = self.synthesizer.synthesize(&exchange.text, voice).await?;
            segments.push(segment);

            let progress = 40 + (45 * (i + 1) / total) as u8;
            self.commit(job_id, |j| j.progress_percent = progress)?;
        }

        self.commit(job_id, |j| {
            j.stage = JobStage::ConcatenatingAudio;
            j.progress_percent = 90;
        })?;

        // Stage 4: concatenate and persist the audio artifact.
        let combined = audio::concatenate_segments(&segments, self.pause_ms)?;
        let audio_file = audio::write_audio(&self.podcast_dir, job_id, &combined)?;
        let duration = estimated_duration_seconds(total, self.seconds_per_exchange);

        self.commit(job_id, |j| {
            j.stage = JobStage::Done;
            j.status = JobStatus::Complete;
            j.progress_percent = 100;
            j.audio_path = Some(audio_file.to_string_lossy().into_owned());
            j.duration_seconds = Some(duration);
            j.completed_at = Some(Utc::now());
        })?;

        info!("Podcast job {} complete ({:.0}s estimated)", job_id, duration);
        Ok(())
    }
}
