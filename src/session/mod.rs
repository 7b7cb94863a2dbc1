//! Chat session: the message set a presentation layer renders.
//!
//! [`ChatSession`] owns an [`Orchestrator`] and the receiving end of its
//! event channel. Applying events keeps the message list in emission order,
//! drops a participant's thinking placeholders once that participant settles
//! a message or stops thinking (disabled or cancelled), and tracks
//! sub-response approval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ChatConfig;
use crate::error::{SessionError, SessionResult, TurnResult};
use crate::message::{Message, MessageKind};
use crate::orchestrator::{
    ChannelSink, ConversationEvent, ConversationSink, DiscussionMode, Orchestrator, TurnHandle,
    TurnRequest, TurnSettings,
};
use crate::personas::{Participant, ParticipantStatus};
use crate::tree::{build_message_tree, MessageTree};

/// Serializable record of a session, for an external persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// Messages in emission order.
    pub messages: Vec<Message>,
    /// Participant roster with statuses.
    pub participants: Vec<Participant>,
    /// Turns submitted so far.
    pub turns: u32,
    /// Activity toggles.
    pub settings: TurnSettings,
    /// Discussion mode.
    pub mode: DiscussionMode,
    /// Complexity (1-10).
    pub complexity: u8,
}

/// One conversation with its participants and message history.
pub struct ChatSession {
    id: String,
    orchestrator: Orchestrator,
    sink: Arc<dyn ConversationSink>,
    events: UnboundedReceiver<ConversationEvent>,
    messages: Vec<Message>,
    turns: u32,
    settings: TurnSettings,
    mode: DiscussionMode,
    complexity: u8,
}

impl ChatSession {
    /// Create a session with default turn parameters.
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self::from_config(orchestrator, &ChatConfig::default())
    }

    /// Create a session using the turn parameters in `config`.
    pub fn from_config(orchestrator: Orchestrator, config: &ChatConfig) -> Self {
        let (sink, events) = ChannelSink::new();
        let id = Uuid::new_v4().to_string();
        info!(session_id = %id, mode = %config.mode, "Chat session created");
        Self {
            id,
            orchestrator,
            sink: Arc::new(sink),
            events,
            messages: Vec::new(),
            turns: 0,
            settings: config.settings,
            mode: config.mode,
            complexity: config.complexity.clamp(1, 10),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The orchestrator driving this session.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Messages in emission order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Turns submitted so far.
    pub fn turns(&self) -> u32 {
        self.turns
    }

    /// Current activity toggles.
    pub fn settings(&self) -> TurnSettings {
        self.settings
    }

    /// Set activity toggles for later turns.
    pub fn set_settings(&mut self, settings: TurnSettings) {
        self.settings = settings;
    }

    /// Current discussion mode.
    pub fn mode(&self) -> DiscussionMode {
        self.mode
    }

    /// Set the discussion mode for later turns.
    pub fn set_mode(&mut self, mode: DiscussionMode) {
        self.mode = mode;
    }

    /// Set complexity (clamped to 1-10) for later turns.
    pub fn set_complexity(&mut self, complexity: u8) {
        self.complexity = complexity.clamp(1, 10);
    }

    /// Participant roster with live statuses.
    pub fn participants(&self) -> Vec<Participant> {
        self.orchestrator.participants()
    }

    /// Threaded view of the current messages.
    pub fn tree(&self) -> MessageTree {
        build_message_tree(&self.messages)
    }

    /// Sub-responses still awaiting approval.
    pub fn pending_sub_responses(&self) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.is_pending_sub_response())
            .collect()
    }

    /// Post a user prompt and start a turn with every enabled participant.
    ///
    /// The user message joins the history only if the turn is accepted.
    pub fn submit(&mut self, prompt: &str) -> TurnResult<TurnHandle> {
        let user_message = Message::user(prompt.trim());
        let participant_ids: Vec<String> = self
            .orchestrator
            .participants()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let request = TurnRequest::new(user_message.clone(), participant_ids)
            .with_complexity(self.complexity)
            .with_mode(self.mode)
            .with_settings(self.settings);

        let handle = self.orchestrator.begin_turn(request, self.sink.clone())?;
        self.turns += 1;
        self.messages.push(user_message);
        info!(session_id = %self.id, turn = handle.turn(), "Prompt submitted");
        Ok(handle)
    }

    /// Apply every event received so far. Returns how many were applied.
    ///
    /// Also clears placeholders left behind by cancelled work, even when no
    /// new event arrived.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while self.poll_event().is_some() {
            applied += 1;
        }
        self.drop_stale_placeholders();
        applied
    }

    /// Apply and return the next already-received event, without waiting.
    pub fn poll_event(&mut self) -> Option<ConversationEvent> {
        let event = self.events.try_recv().ok()?;
        self.apply(&event);
        Some(event)
    }

    /// Wait for the next event, apply it, and return it.
    ///
    /// Pending forever while no turn is running; pair it with
    /// [`TurnHandle::join`] in a `select!`.
    pub async fn next_event(&mut self) -> Option<ConversationEvent> {
        let event = self.events.recv().await?;
        self.apply(&event);
        Some(event)
    }

    fn apply(&mut self, event: &ConversationEvent) {
        // The message half of a sub-response already arrived as a message event.
        let ConversationEvent::Message(message) = event else {
            return;
        };
        if !message.is_thinking() {
            let author = &message.participant_id;
            self.messages
                .retain(|m| !(m.is_thinking() && &m.participant_id == author));
        }
        self.messages.push(message.clone());
        self.drop_stale_placeholders();
    }

    fn drop_stale_placeholders(&mut self) {
        let before = self.messages.len();
        let orchestrator = &self.orchestrator;
        self.messages
            .retain(|m| !is_stale_placeholder(orchestrator, m));
        let dropped = before - self.messages.len();
        if dropped > 0 {
            debug!(session_id = %self.id, dropped, "Dropped stale thinking placeholders");
        }
    }

    /// Accept a pending sub-response into the main conversation.
    pub fn approve_sub_response(&mut self, message_id: &str) -> SessionResult<&Message> {
        let index = self.pending_index(message_id)?;
        let message = &mut self.messages[index];
        message.approved = Some(true);
        message.kind = MessageKind::Message;
        info!(session_id = %self.id, message_id, "Sub-response approved");
        Ok(&self.messages[index])
    }

    /// Discard a pending sub-response. Its replies, if any, become roots.
    pub fn reject_sub_response(&mut self, message_id: &str) -> SessionResult<Message> {
        let index = self.pending_index(message_id)?;
        info!(session_id = %self.id, message_id, "Sub-response rejected");
        Ok(self.messages.remove(index))
    }

    fn pending_index(&self, message_id: &str) -> SessionResult<usize> {
        let index = self
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| SessionError::MessageNotFound {
                message_id: message_id.to_string(),
            })?;
        if !self.messages[index].is_pending_sub_response() {
            return Err(SessionError::NotPendingSubResponse {
                message_id: message_id.to_string(),
            });
        }
        Ok(index)
    }

    /// Flip a participant between enabled and disabled. Returns the new state.
    ///
    /// Disabling also removes the participant's thinking placeholders.
    pub fn toggle_participant(&mut self, participant_id: &str) -> SessionResult<bool> {
        let enabled = self
            .orchestrator
            .participant_status(participant_id)
            .map(|status| status == ParticipantStatus::Inactive)
            .ok_or_else(|| SessionError::UnknownParticipant {
                participant_id: participant_id.to_string(),
            })?;
        self.orchestrator
            .set_participant_enabled(participant_id, enabled)?;
        if !enabled {
            self.drop_stale_placeholders();
        }
        Ok(enabled)
    }

    /// Cancel all scheduled work and start over with an empty history.
    ///
    /// Participants the user disabled stay disabled.
    pub fn reset(&mut self) {
        self.discard_pending();
        self.messages.clear();
        self.turns = 0;
        info!(session_id = %self.id, "Chat session reset");
    }

    /// Capture the session for persistence.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            created_at: Utc::now(),
            messages: self
                .messages
                .iter()
                .filter(|m| !is_stale_placeholder(&self.orchestrator, m))
                .cloned()
                .collect(),
            participants: self.orchestrator.participants(),
            turns: self.turns,
            settings: self.settings,
            mode: self.mode,
            complexity: self.complexity,
        }
    }

    /// Replace the session state with `snapshot`.
    ///
    /// Pending work is cancelled first. Thinking placeholders are dropped
    /// since nothing will settle them. Participants unknown to the registry
    /// are skipped.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.discard_pending();
        self.orchestrator.reset_participants();
        for participant in &snapshot.participants {
            if participant.status != ParticipantStatus::Inactive {
                continue;
            }
            if let Err(e) = self
                .orchestrator
                .set_participant_enabled(&participant.id, false)
            {
                warn!(
                    session_id = %snapshot.session_id,
                    error = %e,
                    "Skipping participant from snapshot"
                );
            }
        }

        self.id = snapshot.session_id;
        self.messages = snapshot
            .messages
            .into_iter()
            .filter(|m| !m.is_thinking())
            .collect();
        self.turns = snapshot.turns;
        self.settings = snapshot.settings;
        self.mode = snapshot.mode;
        self.complexity = snapshot.complexity.clamp(1, 10);
        info!(session_id = %self.id, messages = self.messages.len(), "Chat session restored");
    }

    fn discard_pending(&mut self) {
        self.orchestrator.cancel_all();
        let mut dropped = 0;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(session_id = %self.id, dropped, "Discarded undelivered events");
        }
    }
}

/// A placeholder is live only while its author is still thinking.
fn is_stale_placeholder(orchestrator: &Orchestrator, message: &Message) -> bool {
    message.is_thinking()
        && orchestrator.participant_status(&message.participant_id)
            != Some(ParticipantStatus::Thinking)
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.orchestrator.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratedContent, MockContentGenerator};
    use crate::personas::PersonalityRegistry;
    use crate::timing::TimingPolicy;

    fn session() -> ChatSession {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate()
            .returning(|_| Ok(GeneratedContent::new("fine by me", 0.7, "mock")));
        let orchestrator = Orchestrator::with_seed(
            Arc::new(PersonalityRegistry::new()),
            Arc::new(mock),
            TimingPolicy::default()
                .with_reaction_chances(0.0, 0.0)
                .with_follow_up_chance(0.0),
            11,
        );
        ChatSession::new(orchestrator)
    }

    fn push(session: &mut ChatSession, message: Message) {
        session.apply(&ConversationEvent::Message(message));
    }

    #[test]
    fn test_settled_message_replaces_own_thinking() {
        let mut s = session();
        for id in ["analyst", "skeptic"] {
            s.orchestrator().set_status(id, ParticipantStatus::Thinking);
        }
        push(&mut s, Message::thinking("analyst", "hmm"));
        push(&mut s, Message::thinking("skeptic", "hmm"));
        push(&mut s, Message::new("analyst", "Here is my take"));

        let kinds: Vec<(&str, MessageKind)> = s
            .messages()
            .iter()
            .map(|m| (m.participant_id.as_str(), m.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("skeptic", MessageKind::Thinking),
                ("analyst", MessageKind::Message),
            ]
        );
    }

    #[test]
    fn test_sub_response_event_not_duplicated() {
        let mut s = session();
        let parent = Message::new("analyst", "parent");
        let child = Message::new("skeptic", "child")
            .with_kind(MessageKind::SubResponse)
            .with_parent(&parent.id);
        push(&mut s, parent.clone());
        push(&mut s, child.clone());
        s.apply(&ConversationEvent::SubResponse {
            message: child,
            parent_id: parent.id,
        });
        assert_eq!(s.messages().len(), 2);
    }

    #[test]
    fn test_approve_sub_response() {
        let mut s = session();
        let child = Message::new("skeptic", "branch").with_kind(MessageKind::SubResponse);
        push(&mut s, child.clone());
        assert_eq!(s.pending_sub_responses().len(), 1);

        let approved = s.approve_sub_response(&child.id).unwrap();
        assert_eq!(approved.kind, MessageKind::Message);
        assert_eq!(approved.approved, Some(true));
        assert!(s.pending_sub_responses().is_empty());

        assert_eq!(
            s.approve_sub_response(&child.id).unwrap_err(),
            SessionError::NotPendingSubResponse {
                message_id: child.id.clone()
            }
        );
    }

    #[test]
    fn test_reject_sub_response_removes_it() {
        let mut s = session();
        let parent = Message::new("analyst", "parent");
        let child = Message::new("skeptic", "branch")
            .with_kind(MessageKind::SubResponse)
            .with_parent(&parent.id);
        push(&mut s, parent.clone());
        push(&mut s, child.clone());

        let removed = s.reject_sub_response(&child.id).unwrap();
        assert_eq!(removed.id, child.id);
        assert_eq!(s.messages().len(), 1);
        assert!(matches!(
            s.reject_sub_response(&child.id),
            Err(SessionError::MessageNotFound { .. })
        ));
        assert!(matches!(
            s.reject_sub_response(&parent.id),
            Err(SessionError::NotPendingSubResponse { .. })
        ));
    }

    #[test]
    fn test_toggle_participant() {
        let mut s = session();
        assert!(!s.toggle_participant("empath").unwrap());
        assert_eq!(
            s.orchestrator().participant_status("empath"),
            Some(ParticipantStatus::Inactive)
        );
        assert!(s.toggle_participant("empath").unwrap());
        assert!(s.toggle_participant("ghost").is_err());
    }

    #[tokio::test]
    async fn test_rejected_submit_leaves_history_untouched() {
        let mut s = session();
        assert!(s.submit("   ").is_err());
        assert!(s.messages().is_empty());
        assert_eq!(s.turns(), 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut s = session();
        push(&mut s, Message::user("hello"));
        let value = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(value["sessionId"], s.id());
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["participants"].as_array().unwrap().len(), 5);
    }
}
