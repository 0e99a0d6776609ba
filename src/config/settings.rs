//! Configuration settings for Podkast.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub script: ScriptSettings,
    pub audio: AudioSettings,
    pub qa: QaSettings,
    pub playback: PlaybackSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (uploads, generated audio, database).
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.podkast".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

/// Script generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// LLM model for dialogue generation.
    pub model: String,
    /// Maximum chunks to retrieve per source document.
    pub chunks_per_document: usize,
    /// Approximate input token budget before content gets summarized.
    pub max_input_tokens: usize,
    /// Words of dialogue per target minute.
    pub words_per_minute: usize,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            chunks_per_document: 6,
            max_input_tokens: 12000,
            words_per_minute: 150,
        }
    }
}

/// Audio synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// TTS model identifier.
    pub tts_model: String,
    /// Voice ID for the host speaker.
    pub host_voice: String,
    /// Voice ID for the guest speaker.
    pub guest_voice: String,
    /// Silence inserted between dialogue lines, in milliseconds.
    pub pause_ms: u64,
    /// Attempt-level timeout for TTS calls, in seconds.
    pub request_timeout_seconds: u64,
    /// Maximum retry attempts per TTS call.
    pub max_retries: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tts_model: "eleven_turbo_v2".to_string(),
            host_voice: "21m00Tcm4TlvDq8ikWAM".to_string(),
            guest_voice: "EXAVITQu4vr4xnSDxMaL".to_string(),
            pause_ms: 500,
            request_timeout_seconds: 60,
            max_retries: 3,
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Number of document chunks to retrieve for context.
    pub max_context_chunks: usize,
    /// How far back the recent-dialogue window reaches, in seconds.
    pub lookback_seconds: f64,
    /// Synthesize answer audio in addition to the text answer.
    pub voice_answers: bool,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_context_chunks: 5,
            lookback_seconds: 60.0,
            voice_answers: true,
        }
    }
}

/// Playback interruption settings.
///
/// `seconds_per_exchange` doubles as the chunk-boundary length used to pick
/// the resume point, so changing it alters where playback resumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Estimated duration of one dialogue exchange, in seconds.
    pub seconds_per_exchange: f64,
    /// Volume ramp duration for fade out/in, in seconds.
    pub fade_seconds: f64,
    /// Fixed wait for the acknowledgment clip to play out, in seconds.
    pub ack_window_seconds: f64,
    /// Fixed wait for the return transition clip, in seconds.
    pub transition_window_seconds: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            seconds_per_exchange: 8.0,
            fade_seconds: 1.0,
            ack_window_seconds: 3.0,
            transition_window_seconds: 3.0,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PodkastError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podkast")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory for uploaded source documents.
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir().join("uploads")
    }

    /// Directory for generated podcast audio and script artifacts.
    pub fn podcast_dir(&self) -> PathBuf {
        self.data_dir().join("generated").join("podcasts")
    }

    /// Directory for generated answer audio clips.
    pub fn answer_dir(&self) -> PathBuf {
        self.data_dir().join("generated").join("answers")
    }

    /// Path to the SQLite metadata database.
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir().join("podkast.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.playback.seconds_per_exchange, 8.0);
        assert_eq!(settings.qa.max_context_chunks, 5);
        assert_eq!(settings.chunking.chunk_size, 2000);
    }

    #[test]
    fn test_roundtrip_toml() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, settings.server.port);
        assert_eq!(
            parsed.playback.seconds_per_exchange,
            settings.playback.seconds_per_exchange
        );
    }

    #[test]
    fn test_derived_paths() {
        let settings = Settings::default();
        assert!(settings.podcast_dir().ends_with("generated/podcasts"));
        assert!(settings.answer_dir().ends_with("generated/answers"));
    }
}
