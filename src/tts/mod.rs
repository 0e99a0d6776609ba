//! Speech synthesis abstraction.

mod elevenlabs;

pub use elevenlabs::ElevenLabsSynthesizer;

use crate::error::Result;
use crate::script::Speaker;
use async_trait::async_trait;

/// Voice assignment for the two podcast speakers.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub host: String,
    pub guest: String,
}

impl VoiceConfig {
    /// Voice ID for a speaker.
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Host => &self.host,
            Speaker::Guest => &self.guest,
        }
    }
}

/// Trait for text-to-speech backends.
///
/// Returns encoded MP3 audio; callers decide where the bytes go.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for a single line of text with the given voice.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>>;
}
