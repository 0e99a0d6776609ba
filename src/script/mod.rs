//! Podcast dialogue scripts.
//!
//! A script is an ordered list of host/guest exchanges. Start times are
//! estimated with a fixed seconds-per-exchange heuristic; they exist for
//! dialogue-window lookup during Q&A, not for exact audio alignment.

mod openai;

pub use openai::OpenAiDialogueGenerator;

use crate::error::{PodkastError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Speaker of a dialogue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Host,
    Guest,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::Host => write!(f, "host"),
            Speaker::Guest => write!(f, "guest"),
        }
    }
}

/// One line of podcast dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptExchange {
    /// Position in the script.
    pub index: u32,
    /// Who speaks this line.
    pub speaker: Speaker,
    /// The spoken text.
    pub text: String,
    /// Estimated playback start of this line, in seconds. Monotonically
    /// non-decreasing across the script.
    pub estimated_start_seconds: f64,
}

/// Trait for dialogue generation backends.
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    /// Generate raw dialogue text for the given source content.
    ///
    /// The output is expected in `Host: ...` / `Guest: ...` line format and
    /// is parsed with [`parse_dialogue`].
    async fn generate_dialogue(
        &self,
        topic: &str,
        content: &str,
        duration_minutes: u32,
    ) -> Result<String>;
}

/// Parse raw LLM dialogue text into ordered exchanges.
///
/// Tolerates label variants the model tends to produce ("Host A:", speaker
/// names, bold markers). Lines without a recognizable speaker are skipped.
pub fn parse_dialogue(dialogue_text: &str) -> Result<Vec<ScriptExchange>> {
    let mut exchanges = Vec::new();

    for line in dialogue_text.lines() {
        let line = line.trim().trim_start_matches("**");
        if line.is_empty() {
            continue;
        }

        let Some((label, text)) = line.split_once(':') else {
            continue;
        };

        let label = label.trim().trim_end_matches("**").to_lowercase();
        let text = text.trim().trim_start_matches("**").trim();

        let speaker = if label.contains("guest") || label.contains("jordan") || label == "host b" {
            Speaker::Guest
        } else if label.contains("host") || label.contains("alex") {
            Speaker::Host
        } else {
            warn!("Skipping line with unknown speaker: {:.50}", line);
            continue;
        };

        if text.is_empty() {
            continue;
        }

        exchanges.push(ScriptExchange {
            index: exchanges.len() as u32,
            speaker,
            text: text.to_string(),
            estimated_start_seconds: 0.0,
        });
    }

    if exchanges.is_empty() {
        return Err(PodkastError::ScriptGeneration(
            "Could not parse any dialogue lines from generated text".to_string(),
        ));
    }

    Ok(exchanges)
}

/// Assign estimated start times by walking the script and adding a fixed
/// per-exchange duration cumulatively.
pub fn assign_start_times(exchanges: &mut [ScriptExchange], seconds_per_exchange: f64) {
    for (i, exchange) in exchanges.iter_mut().enumerate() {
        exchange.index = i as u32;
        exchange.estimated_start_seconds = i as f64 * seconds_per_exchange;
    }
}

/// Estimated total duration of a script under the fixed heuristic.
pub fn estimated_duration_seconds(exchange_count: usize, seconds_per_exchange: f64) -> f64 {
    exchange_count as f64 * seconds_per_exchange
}

/// Path of the script artifact for a podcast.
pub fn script_path(podcast_dir: &Path, podcast_id: &str) -> PathBuf {
    podcast_dir.join(format!("{}_script.json", podcast_id))
}

/// Persist the script artifact as an ordered JSON array.
pub fn save_script(podcast_dir: &Path, podcast_id: &str, script: &[ScriptExchange]) -> Result<()> {
    std::fs::create_dir_all(podcast_dir)?;
    let path = script_path(podcast_dir, podcast_id);
    let json = serde_json::to_string_pretty(script)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load the script artifact for a podcast.
///
/// A missing or empty script for a supposedly complete podcast is a
/// consistency failure, surfaced as `MissingScript`.
pub fn load_script(podcast_dir: &Path, podcast_id: &str) -> Result<Vec<ScriptExchange>> {
    let path = script_path(podcast_dir, podcast_id);

    if !path.exists() {
        return Err(PodkastError::MissingScript(format!(
            "Script file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let script: Vec<ScriptExchange> = serde_json::from_str(&content)?;

    if script.is_empty() {
        return Err(PodkastError::MissingScript(format!(
            "Script file is empty: {}",
            path.display()
        )));
    }

    Ok(script)
}
