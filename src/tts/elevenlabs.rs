//! ElevenLabs text-to-speech adapter.
//!
//! Each call has an attempt-level timeout and bounded exponential backoff on
//! rate limits and server errors. Retries live here, at the adapter level;
//! the pipeline above reports failures without retrying stages.

use super::SpeechSynthesizer;
use crate::error::{PodkastError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const INITIAL_BACKOFF_MS: u64 = 500;

/// ElevenLabs-based speech synthesizer.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl ElevenLabsSynthesizer {
    /// Create a synthesizer reading the API key from `ELEVENLABS_API_KEY`.
    pub fn from_env(model: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let api_key = std::env::var("ELEVENLABS_API_KEY").map_err(|_| {
            PodkastError::Config("ELEVENLABS_API_KEY not set in environment".to_string())
        })?;
        Ok(Self::new(&api_key, model, timeout, max_retries))
    }

    /// Create a synthesizer with an explicit API key.
    pub fn new(api_key: &str, model: &str, timeout: Duration, max_retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_retries,
        }
    }

    async fn attempt(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/text-to-speech/{}", API_BASE, voice_id);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&json!({
                "text": text,
                "model_id": self.model,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PodkastError::Synthesis(format!(
                "TTS request failed with {}: {:.200}",
                status, body
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Whether an attempt failure is worth retrying.
    fn is_retryable(err: &PodkastError) -> bool {
        match err {
            PodkastError::Http(e) => e.is_timeout() || e.is_connect(),
            PodkastError::Synthesis(msg) => {
                msg.contains("429") || msg.contains("500") || msg.contains("502")
                    || msg.contains("503")
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    #[instrument(skip(self, text), fields(voice_id = %voice_id, text_len = text.len()))]
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(PodkastError::InvalidInput("Text cannot be empty".to_string()));
        }

        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            match self.attempt(text, voice_id).await {
                Ok(bytes) => {
                    debug!("Synthesized {} bytes of audio", bytes.len());
                    return Ok(bytes);
                }
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    warn!(
                        "TTS attempt {}/{} failed, retrying in {:?}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| PodkastError::Synthesis("TTS retries exhausted".to_string())))
    }
}
