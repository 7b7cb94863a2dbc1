use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Message;

/// Receiver of orchestrator output.
///
/// `on_message` fires once per settled or placeholder message, in emission
/// order. `on_sub_response` fires once per child message, immediately after
/// that child's `on_message` and always after its parent's. Calls never
/// overlap. Implementations must not call back into the orchestrator.
pub trait ConversationSink: Send + Sync {
    /// A message was emitted.
    fn on_message(&self, message: &Message);

    /// A message attached to `parent_id` was emitted.
    fn on_sub_response(&self, message: &Message, parent_id: &str);
}

/// Event form of the sink callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// Mirrors [`ConversationSink::on_message`].
    Message(Message),
    /// Mirrors [`ConversationSink::on_sub_response`].
    SubResponse {
        /// The child message.
        message: Message,
        /// Id of the message it replies to.
        parent_id: String,
    },
}

impl ConversationEvent {
    /// The message carried by the event.
    pub fn message(&self) -> &Message {
        match self {
            ConversationEvent::Message(message) => message,
            ConversationEvent::SubResponse { message, .. } => message,
        }
    }
}

/// Sink forwarding events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ConversationEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ConversationEvent) {
        if self.tx.send(event).is_err() {
            debug!("Conversation event dropped, receiver closed");
        }
    }
}

impl ConversationSink for ChannelSink {
    fn on_message(&self, message: &Message) {
        self.send(ConversationEvent::Message(message.clone()));
    }

    fn on_sub_response(&self, message: &Message, parent_id: &str) {
        self.send(ConversationEvent::SubResponse {
            message: message.clone(),
            parent_id: parent_id.to_string(),
        });
    }
}

/// Sink built from a pair of closures.
pub struct CallbackSink<M, S> {
    on_message: M,
    on_sub_response: S,
}

impl<M, S> CallbackSink<M, S>
where
    M: Fn(&Message) + Send + Sync,
    S: Fn(&Message, &str) + Send + Sync,
{
    /// Wrap the two callbacks.
    pub fn new(on_message: M, on_sub_response: S) -> Self {
        Self {
            on_message,
            on_sub_response,
        }
    }
}

impl<M, S> ConversationSink for CallbackSink<M, S>
where
    M: Fn(&Message) + Send + Sync,
    S: Fn(&Message, &str) + Send + Sync,
{
    fn on_message(&self, message: &Message) {
        (self.on_message)(message)
    }

    fn on_sub_response(&self, message: &Message, parent_id: &str) {
        (self.on_sub_response)(message, parent_id)
    }
}
