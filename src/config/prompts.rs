//! Prompt templates for Podkast.
//!
//! Prompts can be customized by placing TOML files in a custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub dialogue: DialoguePrompts,
    pub answer: AnswerPrompts,
}

/// Prompts for podcast dialogue generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePrompts {
    /// Main dialogue generation prompt.
    pub generate: String,
    /// Fallback summarization prompt for oversized source content.
    pub summarize: String,
}

impl Default for DialoguePrompts {
    fn default() -> Self {
        Self {
            generate: r#"You are creating a natural, engaging podcast discussion between a host and guest.

**Speakers:**
- Host: Curious, asks insightful questions, represents the learner
- Guest: Knowledgeable expert, explains clearly, makes topics accessible

**Topic:** {{topic}}

**Source Material:**
{{content}}

**Instructions:**
1. Create a {{duration_minutes}}-minute podcast script (approximately {{word_count}} words)
2. Start with a warm, engaging introduction
3. Discuss the key points from the source material
4. Use natural conversation with reactions like "wow," "interesting," "that's fascinating"
5. Host should ask follow-up questions that a learner would ask
6. Guest should explain concepts clearly with examples or analogies
7. End with a brief, memorable conclusion
8. Stay true to the source material - don't make up facts
9. Make it sound like a real conversation, not a lecture

**CRITICAL: Format your response EXACTLY like this:**
Host: [Line of dialogue]
Guest: [Response]
Host: [Follow-up]
Guest: [Explanation]
...

Do not include any text outside of the script format. Do not use markdown code blocks. Begin now:
"#
            .to_string(),

            summarize: r#"Summarize the following content while preserving all key information,
facts, and important details. Keep the summary comprehensive but concise.

Content:
{{content}}

Summary:"#
                .to_string(),
        }
    }
}

/// Prompts for in-playback question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub answer: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            answer: r#"You are answering a listener's question during a podcast.

**Recent Podcast Dialogue:**
{{dialogue}}

**Relevant Information from Source Documents:**
{{chunks}}

**Listener's Question:** {{question}}

**Instructions:**
1. Answer the question naturally and conversationally, as if you're the podcast host responding
2. Use information from the source documents and recent dialogue
3. If the question relates to something just discussed, reference it naturally
4. Keep your answer concise but complete (2-4 sentences typically)
5. If the sources don't fully answer the question, acknowledge this honestly
6. Don't start with "Great question!" or similar - just answer directly
7. Maintain a friendly, educational tone

Your answer:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from defaults, with optional custom directory overrides.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let dialogue_path = custom_path.join("dialogue.toml");
            if dialogue_path.exists() {
                let content = std::fs::read_to_string(&dialogue_path)?;
                prompts.dialogue = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.dialogue.generate.is_empty());
        assert!(!prompts.answer.answer.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Topic: {{topic}}, {{duration_minutes}} minutes.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("topic".to_string(), "Rust".to_string());
        vars.insert("duration_minutes".to_string(), "3".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Topic: Rust, 3 minutes.");
    }
}
