//! Conversation message model.
//!
//! A [`Message`] is the unit of conversation. Messages are immutable once
//! emitted, with two exceptions handled by the session layer: thinking
//! placeholders are removed when they resolve, and pending sub-responses are
//! either promoted or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Participant id reserved for the human user.
pub const USER_PARTICIPANT_ID: &str = "user";

/// Kind of a conversation message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// A settled top-level message.
    #[default]
    Message,
    /// Provisional placeholder shown while a participant is about to respond.
    Thinking,
    /// A participant cutting into another participant's message.
    Interruption,
    /// A reply branch awaiting user approval.
    SubResponse,
    /// A late "circling back" reaction from the follow-up phase.
    FollowUpReaction,
}

impl MessageKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::Thinking => "thinking",
            MessageKind::Interruption => "interruption",
            MessageKind::SubResponse => "sub-response",
            MessageKind::FollowUpReaction => "follow-up-reaction",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "message" => Ok(MessageKind::Message),
            "thinking" => Ok(MessageKind::Thinking),
            "interruption" => Ok(MessageKind::Interruption),
            "sub-response" => Ok(MessageKind::SubResponse),
            "follow-up-reaction" => Ok(MessageKind::FollowUpReaction),
            _ => Err(format!("Unknown message kind: {}", s)),
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub id: String,
    /// Message this one replies to; absent for root-level messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Author of the message (a persona id or [`USER_PARTICIPANT_ID`]).
    pub participant_id: String,
    /// Kind of message.
    pub kind: MessageKind,
    /// Message text; empty only for thinking placeholders.
    pub content: String,
    /// When the message was emitted.
    pub timestamp: DateTime<Utc>,
    /// False only for thinking placeholders.
    pub is_complete: bool,
    /// Messages this one cites, independent of thread position.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references_to: Vec<String>,
    /// Informational confidence score (0.0-1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Approval flag, only meaningful for sub-responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    /// Reasoning text attached by the generator or the thinking template bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Message {
    /// Create a new settled message with a fresh id.
    pub fn new(participant_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            participant_id: participant_id.into(),
            kind: MessageKind::Message,
            content: content.into(),
            timestamp: Utc::now(),
            is_complete: true,
            references_to: Vec::new(),
            confidence: None,
            approved: None,
            reasoning: None,
        }
    }

    /// Create a message authored by the human user.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_PARTICIPANT_ID, content)
    }

    /// Create a thinking placeholder for a participant.
    pub fn thinking(participant_id: impl Into<String>, reasoning: impl Into<String>) -> Self {
        let mut message = Self::new(participant_id, "");
        message.kind = MessageKind::Thinking;
        message.is_complete = false;
        message.reasoning = Some(reasoning.into());
        message
    }

    /// Set message kind. Sub-responses start pending approval.
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self.is_complete = kind != MessageKind::Thinking;
        if kind == MessageKind::SubResponse {
            self.approved = Some(false);
        }
        self
    }

    /// Set the parent message
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Add a cited message id
    pub fn with_reference(mut self, message_id: impl Into<String>) -> Self {
        self.references_to.push(message_id.into());
        self
    }

    /// Set confidence (clamped to 0.0-1.0)
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Set reasoning text
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Whether this message was written by the human user.
    pub fn is_from_user(&self) -> bool {
        self.participant_id == USER_PARTICIPANT_ID
    }

    /// Whether this is a provisional thinking placeholder.
    pub fn is_thinking(&self) -> bool {
        self.kind == MessageKind::Thinking
    }

    /// Whether this is a sub-response still waiting for approval.
    pub fn is_pending_sub_response(&self) -> bool {
        self.kind == MessageKind::SubResponse && self.approved != Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_new() {
        let msg = Message::new("analyst", "Numbers first.");
        assert!(!msg.id.is_empty());
        assert_eq!(msg.kind, MessageKind::Message);
        assert!(msg.is_complete);
        assert!(msg.parent_id.is_none());
        assert!(msg.approved.is_none());
        assert!(!msg.is_from_user());
    }

    #[test]
    fn test_message_ids_unique() {
        let a = Message::new("analyst", "a");
        let b = Message::new("analyst", "a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_user_message() {
        let msg = Message::user("What should we build?");
        assert!(msg.is_from_user());
        assert_eq!(msg.participant_id, USER_PARTICIPANT_ID);
    }

    #[test]
    fn test_thinking_placeholder() {
        let msg = Message::thinking("skeptic", "Looking for the weak spot...");
        assert!(msg.is_thinking());
        assert!(!msg.is_complete);
        assert!(msg.content.is_empty());
        assert_eq!(msg.reasoning.as_deref(), Some("Looking for the weak spot..."));
    }

    #[test]
    fn test_sub_response_starts_pending() {
        let msg = Message::new("skeptic", "But what about cost?")
            .with_kind(MessageKind::SubResponse)
            .with_parent("parent-1");
        assert_eq!(msg.approved, Some(false));
        assert!(msg.is_pending_sub_response());
        assert_eq!(msg.parent_id.as_deref(), Some("parent-1"));
    }

    #[test]
    fn test_confidence_clamp() {
        let high = Message::new("a", "b").with_confidence(1.7);
        assert_eq!(high.confidence, Some(1.0));
        let low = Message::new("a", "b").with_confidence(-0.2);
        assert_eq!(low.confidence, Some(0.0));
    }

    #[test]
    fn test_message_kind_from_str() {
        assert_eq!("sub-response".parse::<MessageKind>().unwrap(), MessageKind::SubResponse);
        assert_eq!("SUB_RESPONSE".parse::<MessageKind>().unwrap(), MessageKind::SubResponse);
        assert_eq!(
            "follow-up-reaction".parse::<MessageKind>().unwrap(),
            MessageKind::FollowUpReaction
        );
        assert!("reply".parse::<MessageKind>().is_err());
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let msg = Message::new("visionary", "Imagine it.")
            .with_kind(MessageKind::SubResponse)
            .with_parent("p-1")
            .with_reference("u-1");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["participantId"], json!("visionary"));
        assert_eq!(value["parentId"], json!("p-1"));
        assert_eq!(value["kind"], json!("sub-response"));
        assert_eq!(value["isComplete"], json!(true));
        assert_eq!(value["referencesTo"], json!(["u-1"]));
        assert_eq!(value["approved"], json!(false));
        assert!(value.get("confidence").is_none());
    }

    #[test]
    fn test_message_deserializes_without_optional_fields() {
        let value = json!({
            "id": "m-1",
            "participantId": "user",
            "kind": "message",
            "content": "hi",
            "timestamp": "2024-01-01T00:00:00Z",
            "isComplete": true
        });
        let msg: Message = serde_json::from_value(value).unwrap();
        assert!(msg.parent_id.is_none());
        assert!(msg.references_to.is_empty());
        assert!(msg.is_from_user());
    }
}
