//! In-playback question answering.
//!
//! When a listener interrupts playback with a question, the answer is built
//! from two context sources: the dialogue spoken in the last minute of the
//! podcast (located via the script's estimated start times) and the most
//! relevant chunks of the source documents.

mod answer;
mod context;
mod transitions;

pub use answer::{Answer, QuestionAnswerer};
pub use context::{DialogueLine, QaContext, QaContextBuilder};
pub use transitions::{Acknowledgment, ReturnTransition, TransitionGenerator};

use crate::error::Result;
use crate::playback::QuestionService;
use async_trait::async_trait;

/// The full server-side QA stack, usable as the playback protocol's
/// [`QuestionService`] when the player runs in the same process.
pub struct QaService {
    context_builder: QaContextBuilder,
    answerer: QuestionAnswerer,
    transitions: TransitionGenerator,
}

impl QaService {
    pub fn new(
        context_builder: QaContextBuilder,
        answerer: QuestionAnswerer,
        transitions: TransitionGenerator,
    ) -> Self {
        Self {
            context_builder,
            answerer,
            transitions,
        }
    }
}

#[async_trait]
impl QuestionService for QaService {
    async fn acknowledge(&self, question: &str) -> Result<Acknowledgment> {
        self.transitions.acknowledge(question).await
    }

    async fn answer(&self, podcast_id: &str, question: &str, timestamp: f64) -> Result<Answer> {
        let context = self
            .context_builder
            .build(podcast_id, question, timestamp)
            .await?;
        self.answerer.answer(&context, question, timestamp).await
    }

    async fn return_transition(&self) -> Result<ReturnTransition> {
        self.transitions.return_transition().await
    }
}
