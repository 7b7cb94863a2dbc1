//! Content generator abstraction.
//!
//! The orchestrator never produces text itself. It asks a [`ContentGenerator`]
//! for each message and treats the result as opaque, checking only that the
//! text is non-empty. [`CannedGenerator`] is the built-in implementation
//! backed by response banks.

mod canned;

pub use canned::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationResult;
use crate::orchestrator::DiscussionMode;
use crate::personas::Personality;

/// What the requested message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// A participant's main answer to the user prompt.
    Primary,
    /// Cutting into another participant's message.
    Interruption,
    /// A reply branch under another participant's message.
    SubResponse,
    /// A late "circling back" reaction.
    FollowUp,
}

/// The message a reaction is replying to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyContext {
    /// Author of the message being answered.
    pub participant_id: String,
    /// Content of the message being answered.
    pub content: String,
}

/// Everything a generator needs to produce one message.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Persona speaking.
    pub personality: Personality,
    /// The user prompt of the current turn.
    pub prompt: String,
    /// Discussion mode of the turn.
    pub mode: DiscussionMode,
    /// Purpose of the message.
    pub kind: ResponseKind,
    /// Turn complexity (1-10).
    pub complexity: u8,
    /// Message being replied to, for interruptions and sub-responses.
    pub replying_to: Option<ReplyContext>,
}

/// Generator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Message text. Empty text triggers the orchestrator's fallback line.
    pub text: String,
    /// Confidence score (0.0-1.0).
    pub confidence: f64,
    /// Short explanation of how the text was reached.
    pub reasoning: String,
}

impl GeneratedContent {
    /// Create generated content
    pub fn new(text: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
        }
    }
}

/// Source of message text for simulated participants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Produce content for one message.
    async fn generate(&self, request: GenerationRequest) -> GenerationResult<GeneratedContent>;
}
