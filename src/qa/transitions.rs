//! Host acknowledgment and return-transition clips.
//!
//! When a listener interrupts, the host "hears" the question: a short
//! acknowledgment phrase plus a restatement of the question, spoken in the
//! host voice. After the answer plays, a return phrase hands back to the
//! episode. Phrases are picked at random so repeated interruptions do not
//! sound canned.

use crate::audio;
use crate::error::Result;
use crate::tts::SpeechSynthesizer;
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{instrument, warn};

const ACKNOWLEDGMENT_PHRASES: &[&str] = &[
    "Oh, hold that thought!",
    "Great timing, we just got a question.",
    "Let's pause for a second.",
    "Ooh, a listener wants to jump in.",
    "Hang on, someone has a question.",
];

const RETURN_PHRASES: &[&str] = &[
    "Alright, back to our conversation.",
    "Great question! Now, where were we?",
    "Hope that helps! Let's continue.",
    "Okay, picking up where we left off.",
    "With that cleared up, let's get back to it.",
];

const ACKNOWLEDGMENT_FILENAME: &str = "acknowledgment_temp.mp3";
const RETURN_FILENAME: &str = "return_temp.mp3";

/// The host acknowledging an interruption.
#[derive(Debug, Clone)]
pub struct Acknowledgment {
    /// The randomly chosen acknowledgment phrase.
    pub acknowledgment_text: String,
    /// The listener's question as restated by the host.
    pub question_text: String,
    /// Full spoken text (phrase plus restatement).
    pub full_text: String,
    /// Path of the synthesized clip, when synthesis succeeded.
    pub audio_path: Option<PathBuf>,
}

/// The host handing playback back to the episode.
#[derive(Debug, Clone)]
pub struct ReturnTransition {
    pub text: String,
    pub audio_path: Option<PathBuf>,
}

/// Produces acknowledgment and return-transition clips in the host voice.
pub struct TransitionGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    host_voice: String,
    clip_dir: PathBuf,
}

impl TransitionGenerator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, host_voice: &str, clip_dir: PathBuf) -> Self {
        Self {
            synthesizer,
            host_voice: host_voice.to_string(),
            clip_dir,
        }
    }

    /// Synthesize a clip, tolerating TTS failure. Text always comes back.
    async fn clip(&self, text: &str, filename: &str) -> Option<PathBuf> {
        match self.synthesizer.synthesize(text, &self.host_voice).await {
            Ok(bytes) => match audio::write_clip(&self.clip_dir, filename, &bytes) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Failed to write transition clip {}: {}", filename, e);
                    None
                }
            },
            Err(e) => {
                warn!("Transition clip synthesis failed: {}", e);
                None
            }
        }
    }

    /// Acknowledge an interruption and restate the question.
    #[instrument(skip(self, question))]
    pub async fn acknowledge(&self, question: &str) -> Result<Acknowledgment> {
        let phrase = choose(ACKNOWLEDGMENT_PHRASES);
        let full_text = format!("{} They're asking: {}", phrase, question);
        let audio_path = self.clip(&full_text, ACKNOWLEDGMENT_FILENAME).await;

        Ok(Acknowledgment {
            acknowledgment_text: phrase.to_string(),
            question_text: question.to_string(),
            full_text,
            audio_path,
        })
    }

    /// Produce the return-to-episode transition.
    #[instrument(skip(self))]
    pub async fn return_transition(&self) -> Result<ReturnTransition> {
        let text = choose(RETURN_PHRASES).to_string();
        let audio_path = self.clip(&text, RETURN_FILENAME).await;

        Ok(ReturnTransition { text, audio_path })
    }
}

fn choose(phrases: &[&'static str]) -> &'static str {
    let mut rng = rand::thread_rng();
    phrases.choose(&mut rng).copied().unwrap_or(phrases[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PodkastError;
    use async_trait::async_trait;

    struct OkSynth;

    #[async_trait]
    impl SpeechSynthesizer for OkSynth {
        async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    struct DownSynth;

    #[async_trait]
    impl SpeechSynthesizer for DownSynth {
        async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>> {
            Err(PodkastError::Synthesis("TTS offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_acknowledge_restates_question() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            TransitionGenerator::new(Arc::new(OkSynth), "voice_h", dir.path().to_path_buf());

        let ack = generator.acknowledge("What is entropy?").await.unwrap();

        assert!(ACKNOWLEDGMENT_PHRASES.contains(&ack.acknowledgment_text.as_str()));
        assert!(ack.full_text.contains("They're asking: What is entropy?"));
        assert!(ack.full_text.starts_with(&ack.acknowledgment_text));

        let path = ack.audio_path.unwrap();
        assert!(path.ends_with(ACKNOWLEDGMENT_FILENAME));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_return_transition_clip() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            TransitionGenerator::new(Arc::new(OkSynth), "voice_h", dir.path().to_path_buf());

        let transition = generator.return_transition().await.unwrap();
        assert!(RETURN_PHRASES.contains(&transition.text.as_str()));
        assert!(transition.audio_path.unwrap().ends_with(RETURN_FILENAME));
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            TransitionGenerator::new(Arc::new(DownSynth), "voice_h", dir.path().to_path_buf());

        let ack = generator.acknowledge("Still works?").await.unwrap();
        assert!(ack.audio_path.is_none());
        assert!(!ack.full_text.is_empty());
    }
}
