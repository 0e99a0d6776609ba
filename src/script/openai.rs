//! OpenAI-backed dialogue generation.

use super::DialogueGenerator;
use crate::config::Prompts;
use crate::error::{PodkastError, Result};
use crate::openai::{create_client, estimate_tokens};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Dialogue generator backed by the OpenAI chat completion API.
pub struct OpenAiDialogueGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
    max_input_tokens: usize,
    words_per_minute: usize,
}

impl OpenAiDialogueGenerator {
    /// Create a new dialogue generator.
    pub fn new(model: &str, max_input_tokens: usize, words_per_minute: usize) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            prompts: Prompts::default(),
            max_input_tokens,
            words_per_minute,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    async fn complete(&self, prompt: String, temperature: f32) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PodkastError::ScriptGeneration(e.to_string()))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(temperature)
            .build()
            .map_err(|e| PodkastError::ScriptGeneration(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PodkastError::OpenAI(format!("Chat completion failed: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| PodkastError::ScriptGeneration("Empty response from LLM".to_string()))
    }

    /// Condense oversized source content before dialogue generation.
    async fn summarize(&self, content: &str) -> Result<String> {
        info!("Summarizing content to fit the input token budget");

        let mut vars = HashMap::new();
        vars.insert("content".to_string(), content.to_string());
        let prompt = Prompts::render(&self.prompts.dialogue.summarize, &vars);

        match self.complete(prompt, 0.3).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                // Fall back to truncation rather than failing the stage.
                warn!("Summarization failed, truncating content: {}", e);
                let char_limit = self.max_input_tokens * 4;
                Ok(content.chars().take(char_limit).collect())
            }
        }
    }
}

#[async_trait]
impl DialogueGenerator for OpenAiDialogueGenerator {
    #[instrument(skip(self, content), fields(topic = %topic, duration_minutes))]
    async fn generate_dialogue(
        &self,
        topic: &str,
        content: &str,
        duration_minutes: u32,
    ) -> Result<String> {
        let content = if estimate_tokens(content) > self.max_input_tokens {
            self.summarize(content).await?
        } else {
            content.to_string()
        };

        let word_count = duration_minutes as usize * self.words_per_minute;

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        vars.insert("content".to_string(), content);
        vars.insert("duration_minutes".to_string(), duration_minutes.to_string());
        vars.insert("word_count".to_string(), word_count.to_string());

        let prompt = Prompts::render(&self.prompts.dialogue.generate, &vars);
        let dialogue = self.complete(prompt, 0.7).await?;

        if dialogue.len() < 100 {
            return Err(PodkastError::ScriptGeneration(
                "Generated dialogue is too short or empty".to_string(),
            ));
        }

        Ok(dialogue)
    }
}
