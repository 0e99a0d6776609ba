//! Playback interruption protocol.
//!
//! When a listener asks a question mid-episode, playback walks a fixed ring
//! of phases: fade out, host acknowledgment, answer, return transition, fade
//! back in. The session drives the ring; actual audio output sits behind
//! [`PlayerControl`] and answer generation behind [`QuestionService`], so the
//! protocol is testable without timers or a speaker.
//!
//! The resume point is fixed the moment the fade-out begins: the next
//! exchange boundary at or after the interruption point, which keeps the
//! resumed audio aligned with a dialogue line. Every exit of the ring seeks
//! to that saved boundary; if answering fails the ring short-circuits to the
//! fade-in, but the resume point does not change.

use crate::error::Result;
use crate::qa::{Acknowledgment, Answer, ReturnTransition};
use async_trait::async_trait;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Phase of the interruption ring, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Playing,
    FadingOut,
    AwaitingAcknowledgment,
    AwaitingAnswer,
    PlayingAnswer,
    PlayingTransition,
    FadingIn,
}

impl PlaybackPhase {
    /// The phase that follows this one in the ring.
    pub fn next(self) -> PlaybackPhase {
        match self {
            PlaybackPhase::Playing => PlaybackPhase::FadingOut,
            PlaybackPhase::FadingOut => PlaybackPhase::AwaitingAcknowledgment,
            PlaybackPhase::AwaitingAcknowledgment => PlaybackPhase::AwaitingAnswer,
            PlaybackPhase::AwaitingAnswer => PlaybackPhase::PlayingAnswer,
            PlaybackPhase::PlayingAnswer => PlaybackPhase::PlayingTransition,
            PlaybackPhase::PlayingTransition => PlaybackPhase::FadingIn,
            PlaybackPhase::FadingIn => PlaybackPhase::Playing,
        }
    }
}

/// The resume point after an interruption: the next exchange boundary at or
/// after `position`. A position already on a boundary resumes there.
pub fn next_chunk_boundary(position: f64, chunk_seconds: f64) -> f64 {
    if chunk_seconds <= 0.0 {
        return position;
    }
    (position / chunk_seconds).ceil() * chunk_seconds
}

/// Audio-side operations the interruption session drives.
#[async_trait]
pub trait PlayerControl: Send + Sync {
    /// Ramp episode volume down over `seconds`.
    async fn fade_out(&self, seconds: f64);

    /// Ramp episode volume back up over `seconds`.
    async fn fade_in(&self, seconds: f64);

    /// Move the episode playhead to `position` seconds.
    async fn seek(&self, position: f64);

    /// Play a standalone clip (acknowledgment, answer, transition).
    async fn play_clip(&self, path: &Path);

    /// Hold for a fixed window, letting a clip play out.
    async fn wait(&self, seconds: f64);

    /// Notification that the session entered a new phase.
    fn phase_changed(&self, phase: PlaybackPhase);
}

/// Question-answering operations the session depends on.
#[async_trait]
pub trait QuestionService: Send + Sync {
    async fn acknowledge(&self, question: &str) -> Result<Acknowledgment>;

    async fn answer(&self, podcast_id: &str, question: &str, timestamp: f64) -> Result<Answer>;

    async fn return_transition(&self) -> Result<ReturnTransition>;
}

/// Timing knobs for the interruption ring.
#[derive(Debug, Clone)]
pub struct InterruptionConfig {
    /// Volume ramp duration for fades, in seconds.
    pub fade_seconds: f64,
    /// Fixed window for the acknowledgment clip.
    pub ack_window_seconds: f64,
    /// Fixed window for the return-transition clip.
    pub transition_window_seconds: f64,
    /// Exchange boundary length used to pick the resume point.
    pub seconds_per_exchange: f64,
}

impl Default for InterruptionConfig {
    fn default() -> Self {
        Self {
            fade_seconds: 1.0,
            ack_window_seconds: 3.0,
            transition_window_seconds: 3.0,
            seconds_per_exchange: 8.0,
        }
    }
}

/// How an interruption ended.
#[derive(Debug)]
pub struct InterruptionOutcome {
    /// The answer, when the exchange succeeded.
    pub answer: Option<Answer>,
    /// Spoken return-transition text, when one played.
    pub transition_text: Option<String>,
    /// Position playback resumed at.
    pub resumed_at: f64,
    /// Failure description for a short-circuited exchange.
    pub error: Option<String>,
}

/// Drives one playback interruption from question to resumed playback.
pub struct InterruptionSession<P, Q> {
    player: P,
    qa: Q,
    config: InterruptionConfig,
}

impl<P: PlayerControl, Q: QuestionService> InterruptionSession<P, Q> {
    pub fn new(player: P, qa: Q, config: InterruptionConfig) -> Self {
        Self { player, qa, config }
    }

    fn enter(&self, phase: PlaybackPhase) {
        self.player.phase_changed(phase);
    }

    /// Run the full ring. Always returns with playback resumed; QA failures
    /// resume at the saved boundary instead of propagating.
    #[instrument(skip(self, question), fields(podcast_id = %podcast_id, timestamp))]
    pub async fn run(
        &self,
        podcast_id: &str,
        question: &str,
        timestamp: f64,
    ) -> InterruptionOutcome {
        // Saved once, before the fade-out; success and failure paths both
        // seek here.
        let saved_timestamp = next_chunk_boundary(timestamp, self.config.seconds_per_exchange);

        self.enter(PlaybackPhase::FadingOut);
        self.player.fade_out(self.config.fade_seconds).await;

        self.enter(PlaybackPhase::AwaitingAcknowledgment);
        match self.qa.acknowledge(question).await {
            Ok(ack) => {
                if let Some(path) = &ack.audio_path {
                    self.player.play_clip(path).await;
                }
                self.player.wait(self.config.ack_window_seconds).await;
            }
            Err(e) => {
                warn!("Acknowledgment failed, resuming playback: {}", e);
                return self.abort(saved_timestamp, e.to_string()).await;
            }
        }

        self.enter(PlaybackPhase::AwaitingAnswer);
        let answer = match self.qa.answer(podcast_id, question, timestamp).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Answer generation failed, resuming playback: {}", e);
                return self.abort(saved_timestamp, e.to_string()).await;
            }
        };

        self.enter(PlaybackPhase::PlayingAnswer);
        if let Some(path) = &answer.audio_path {
            self.player.play_clip(path).await;
        }

        self.enter(PlaybackPhase::PlayingTransition);
        let transition_text = match self.qa.return_transition().await {
            Ok(transition) => {
                if let Some(path) = &transition.audio_path {
                    self.player.play_clip(path).await;
                }
                self.player.wait(self.config.transition_window_seconds).await;
                Some(transition.text)
            }
            Err(e) => {
                // A lost transition is cosmetic; go straight to the fade-in.
                warn!("Return transition failed: {}", e);
                None
            }
        };

        self.resume(saved_timestamp).await;

        info!("Interruption complete, resumed at {:.1}s", saved_timestamp);

        InterruptionOutcome {
            answer: Some(answer),
            transition_text,
            resumed_at: saved_timestamp,
            error: None,
        }
    }

    /// Short-circuit the ring after a QA failure, seeking to the boundary
    /// saved when the interruption began.
    async fn abort(&self, saved_timestamp: f64, error: String) -> InterruptionOutcome {
        self.resume(saved_timestamp).await;
        InterruptionOutcome {
            answer: None,
            transition_text: None,
            resumed_at: saved_timestamp,
            error: Some(error),
        }
    }

    async fn resume(&self, position: f64) {
        self.enter(PlaybackPhase::FadingIn);
        self.player.seek(position).await;
        self.player.fade_in(self.config.fade_seconds).await;
        self.enter(PlaybackPhase::Playing);
    }
}
