//! # Persona Chorus
//!
//! A multi-persona chat engine. One user prompt fans out into a paced,
//! threaded discussion between simulated participants: thinking bubbles,
//! primary answers, interruptions, sub-response branches awaiting approval,
//! and late follow-up reactions.
//!
//! ## Features
//!
//! - **Orchestrator**: three-phase turn scheduling on tokio with a single
//!   cancellation scope and a serialized emission gate
//! - **Personalities**: registry of built-in personas with thinking speed,
//!   interruptiveness, tone traits and trigger keywords
//! - **Discussion modes**: collaborative, brainstorm, debate, devil's advocate,
//!   socratic and consensus
//! - **Message tree**: rebuilds the threaded forest from the flat history,
//!   tolerant of dangling parents and cycles
//! - **Sessions**: placeholder cleanup, sub-response approval, snapshots
//!
//! ## Architecture
//!
//! ```text
//! ChatSession → Orchestrator → ContentGenerator (canned or custom)
//!      ↑              ↓
//!      └── ConversationSink (channel) ──┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use persona_chorus::{
//!     CannedGenerator, ChatSession, Orchestrator, PersonalityRegistry, TimingPolicy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(PersonalityRegistry::new()),
//!         Arc::new(CannedGenerator::new()),
//!         TimingPolicy::default(),
//!     );
//!     let mut session = ChatSession::new(orchestrator);
//!     let handle = session.submit("Should we adopt a four-day week?")?;
//!     handle.join().await?;
//!     session.pump();
//!     for node in session.tree().walk() {
//!         println!("{}{}", "  ".repeat(node.depth), node.message.content);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Content generator trait and the canned implementation.
pub mod generator;
/// Message model.
pub mod message;
/// Turn scheduling and event delivery.
pub mod orchestrator;
/// Personality registry and participants.
pub mod personas;
/// Chat session state and approval workflow.
pub mod session;
/// Pacing and probability policy.
pub mod timing;
/// Threaded message tree builder.
pub mod tree;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use generator::{CannedGenerator, ContentGenerator};
pub use message::{Message, MessageKind};
pub use orchestrator::{
    ChannelSink, ConversationEvent, ConversationSink, DiscussionMode, Orchestrator, TurnHandle,
    TurnRequest, TurnSettings, TurnSummary,
};
pub use personas::{Participant, PersonalityRegistry};
pub use session::{ChatSession, SessionSnapshot};
pub use timing::TimingPolicy;
pub use tree::{build_message_tree, MessageTree};
