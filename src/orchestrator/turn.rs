use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::DiscussionMode;
use crate::error::{AppError, AppResult};
use crate::message::{Message, MessageKind};

/// Toggles controlling which kinds of activity a turn may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSettings {
    /// Emit thinking placeholders before responses.
    pub show_thinking: bool,
    /// Allow participants to interrupt each other.
    pub allow_interruptions: bool,
    /// Allow participants to branch into sub-responses.
    pub allow_sub_responses: bool,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            show_thinking: true,
            allow_interruptions: true,
            allow_sub_responses: true,
        }
    }
}

/// One user submission to schedule.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// The user message that opens the turn.
    pub user_message: Message,
    /// Participants to schedule, in display order.
    pub participant_ids: Vec<String>,
    /// Complexity (1-10); stretches response gaps linearly.
    pub complexity: u8,
    /// Discussion mode.
    pub mode: DiscussionMode,
    /// Activity toggles.
    pub settings: TurnSettings,
}

impl TurnRequest {
    /// Create a request with default complexity, mode and settings.
    pub fn new<I, S>(user_message: Message, participant_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_message,
            participant_ids: participant_ids.into_iter().map(Into::into).collect(),
            complexity: 5,
            mode: DiscussionMode::default(),
            settings: TurnSettings::default(),
        }
    }

    /// Set complexity (clamped to 1-10)
    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity.clamp(1, 10);
        self
    }

    /// Set the discussion mode
    pub fn with_mode(mut self, mode: DiscussionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set activity toggles
    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Counts of what a turn emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// Turn number within the orchestrator's lifetime (1-based).
    pub turn: u32,
    /// Thinking placeholders emitted.
    pub thinking: usize,
    /// Primary responses emitted.
    pub responses: usize,
    /// Interruptions emitted.
    pub interruptions: usize,
    /// Sub-responses emitted.
    pub sub_responses: usize,
    /// Follow-up reactions emitted.
    pub follow_ups: usize,
    /// Messages whose text came from the fallback line.
    pub fallbacks: usize,
    /// Whether the turn was cut short by cancellation.
    pub cancelled: bool,
}

impl TurnSummary {
    pub(crate) fn new(turn: u32) -> Self {
        Self {
            turn,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Thinking => self.thinking += 1,
            MessageKind::Message => self.responses += 1,
            MessageKind::Interruption => self.interruptions += 1,
            MessageKind::SubResponse => self.sub_responses += 1,
            MessageKind::FollowUpReaction => self.follow_ups += 1,
        }
    }

    /// Total settled (non-thinking) messages.
    pub fn settled_messages(&self) -> usize {
        self.responses + self.interruptions + self.sub_responses + self.follow_ups
    }
}

/// Handle on a scheduled turn.
///
/// Dropping the handle does not cancel the turn; use
/// [`Orchestrator::cancel_all`](super::Orchestrator::cancel_all).
#[derive(Debug)]
pub struct TurnHandle {
    turn: u32,
    settled: watch::Receiver<bool>,
    task: JoinHandle<TurnSummary>,
}

impl TurnHandle {
    pub(crate) fn new(
        turn: u32,
        settled: watch::Receiver<bool>,
        task: JoinHandle<TurnSummary>,
    ) -> Self {
        Self {
            turn,
            settled,
            task,
        }
    }

    /// Turn number (1-based).
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// True until the thinking and primary phases, including every
    /// interruption and sub-response they scheduled, have finished.
    ///
    /// Follow-up reactions may still arrive after this turns false.
    pub fn is_processing(&self) -> bool {
        !*self.settled.borrow() && !self.task.is_finished()
    }

    /// Whether every phase, follow-ups included, has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until [`is_processing`](Self::is_processing) turns false.
    pub async fn settled(&mut self) {
        // An error means the driver is gone, which also ends processing.
        let _ = self.settled.wait_for(|done| *done).await;
    }

    /// Wait for all phases, follow-ups included, and return the summary.
    pub async fn join(self) -> AppResult<TurnSummary> {
        self.task.await.map_err(|e| AppError::Internal {
            message: format!("turn {} driver failed: {}", self.turn, e),
        })
    }
}
