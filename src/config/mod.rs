//! Configuration management for Podkast.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    AudioSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, PlaybackSettings,
    QaSettings, ScriptSettings, ServerSettings, Settings,
};
