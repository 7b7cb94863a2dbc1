//! Turn driver and the three scheduling phases.
//!
//! Random draws happen on the driver task, in a fixed order, before work is
//! spawned. That keeps a seeded orchestrator reproducible no matter how the
//! runtime interleaves the spawned tasks.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    response_order, ConversationSink, DiscussionMode, Orchestrator, TurnRequest, TurnSettings,
    TurnSummary,
};
use crate::error::GenerationError;
use crate::generator::{GeneratedContent, GenerationRequest, ReplyContext, ResponseKind};
use crate::message::{Message, MessageKind};
use crate::personas::{ParticipantStatus, Personality};

const FALLBACK_PRIMARY: &str = "I need a moment to gather my thoughts on this one.";
const FALLBACK_REACTION: &str = "Good point. Let me come back to that.";
const FALLBACK_FOLLOW_UP: &str = "Circling back: I'm still thinking this through.";

/// Shared state of one running turn.
pub(super) struct TurnContext {
    orchestrator: Orchestrator,
    turn: u32,
    token: CancellationToken,
    sink: Arc<dyn ConversationSink>,
    user_message: Message,
    personalities: Vec<Personality>,
    complexity: u8,
    mode: DiscussionMode,
    settings: TurnSettings,
    summary: Mutex<TurnSummary>,
}

impl TurnContext {
    pub(super) fn new(
        orchestrator: Orchestrator,
        turn: u32,
        token: CancellationToken,
        sink: Arc<dyn ConversationSink>,
        request: TurnRequest,
        personalities: Vec<Personality>,
    ) -> Self {
        Self {
            orchestrator,
            turn,
            token,
            sink,
            user_message: request.user_message,
            personalities,
            complexity: request.complexity.clamp(1, 10),
            mode: request.mode,
            settings: request.settings,
            summary: Mutex::new(TurnSummary::new(turn)),
        }
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return !self.token.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn emit(&self, message: &Message) -> bool {
        let delivered = self
            .orchestrator
            .emit(&self.token, self.sink.as_ref(), message);
        if delivered {
            self.summary
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(message.kind);
            debug!(
                turn = self.turn,
                participant = %message.participant_id,
                message_id = %message.id,
                kind = %message.kind,
                "Message emitted"
            );
        }
        delivered
    }

    /// Whether `id` may still speak. Disabling can land while a generator
    /// call is in flight, so this is checked again right before emitting.
    fn still_enabled(&self, id: &str) -> bool {
        let enabled = self.orchestrator.is_enabled(id);
        if !enabled {
            debug!(turn = self.turn, participant = %id, "Participant disabled, dropping message");
        }
        enabled
    }

    /// Return `id` to active after scheduled work ends without a message.
    fn idle(&self, id: &str) {
        self.orchestrator.set_status(id, ParticipantStatus::Active);
    }

    fn note_fallback(&self) {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fallbacks += 1;
    }

    /// Ask the generator for content, substituting a fallback line on error,
    /// empty text, deadline overrun or panic. Returns `None` only when the
    /// turn is cancelled while waiting.
    async fn generate(
        &self,
        personality: &Personality,
        kind: ResponseKind,
        replying_to: Option<&Message>,
    ) -> Option<GeneratedContent> {
        let request = GenerationRequest {
            personality: personality.clone(),
            prompt: self.user_message.content.clone(),
            mode: self.mode,
            kind,
            complexity: self.complexity,
            replying_to: replying_to.map(|m| ReplyContext {
                participant_id: m.participant_id.clone(),
                content: m.content.clone(),
            }),
        };
        let generator = self.orchestrator.generator();
        let timeout = self.orchestrator.timing().generation_timeout();

        // Own task so a panicking generator cannot take the turn down with it.
        let mut call = tokio::spawn(async move {
            tokio::time::timeout(timeout, generator.generate(request)).await
        });

        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                call.abort();
                return None;
            }
            joined = &mut call => joined,
        };

        let failure = match outcome {
            Ok(Ok(Ok(content))) if !content.text.trim().is_empty() => return Some(content),
            Ok(Ok(Ok(_))) => GenerationError::Empty {
                participant_id: personality.id.clone(),
            },
            Ok(Ok(Err(e))) => e,
            Ok(Err(_)) => GenerationError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            },
            Err(e) => GenerationError::Failed {
                participant_id: personality.id.clone(),
                message: e.to_string(),
            },
        };

        warn!(
            turn = self.turn,
            participant = %personality.id,
            error = %failure,
            "Content generation failed, using fallback"
        );
        self.note_fallback();
        let text = match kind {
            ResponseKind::Primary => FALLBACK_PRIMARY,
            ResponseKind::Interruption | ResponseKind::SubResponse => FALLBACK_REACTION,
            ResponseKind::FollowUp => FALLBACK_FOLLOW_UP,
        };
        Some(GeneratedContent {
            text: text.to_string(),
            confidence: 0.0,
            reasoning: format!("fallback: {}", failure),
        })
    }

    fn summary(&self) -> TurnSummary {
        let mut summary = self
            .summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        summary.cancelled = self.token.is_cancelled();
        summary
    }
}

/// Drive one turn through all three phases.
pub(super) async fn run_turn(ctx: Arc<TurnContext>, settled: watch::Sender<bool>) -> TurnSummary {
    if ctx.settings.show_thinking {
        thinking_phase(&ctx).await;
    }

    let mut reactions = JoinSet::new();
    let responses = primary_phase(&ctx, &mut reactions).await;
    while reactions.join_next().await.is_some() {}

    let _ = settled.send(true);
    info!(
        turn = ctx.turn,
        responses = responses.len(),
        cancelled = ctx.token.is_cancelled(),
        "Turn settled"
    );

    if !ctx.token.is_cancelled() && !responses.is_empty() {
        follow_up_phase(&ctx, &responses).await;
    }

    let summary = ctx.summary();
    info!(
        turn = summary.turn,
        messages = summary.settled_messages(),
        follow_ups = summary.follow_ups,
        fallbacks = summary.fallbacks,
        cancelled = summary.cancelled,
        "Turn complete"
    );
    summary
}

/// Phase 1: one staggered thinking placeholder per participant.
async fn thinking_phase(ctx: &Arc<TurnContext>) {
    let timing = ctx.orchestrator.timing();
    let mut set = JoinSet::new();

    for (index, personality) in ctx.personalities.iter().enumerate() {
        let (stagger, duration, reasoning) = {
            let mut rng = ctx.orchestrator.rng();
            let stagger = timing.thinking_stagger(index, &mut *rng);
            let duration = timing.thinking_delay(personality.thinking_speed, &mut *rng);
            let reasoning = personality
                .thinking_templates
                .choose(&mut *rng)
                .cloned()
                .unwrap_or_else(|| format!("{} is thinking...", personality.name));
            (stagger, duration, reasoning)
        };

        let ctx = Arc::clone(ctx);
        let id = personality.id.clone();
        set.spawn(async move {
            if !ctx.pause(stagger).await || !ctx.orchestrator.is_enabled(&id) {
                return;
            }
            ctx.orchestrator.set_status(&id, ParticipantStatus::Thinking);
            if ctx.emit(&Message::thinking(&id, reasoning)) {
                ctx.pause(duration).await;
            } else {
                ctx.idle(&id);
            }
        });
    }

    while set.join_next().await.is_some() {}
}

/// Phase 2: primary responses in policy order, scheduling reactions as they land.
async fn primary_phase(ctx: &Arc<TurnContext>, reactions: &mut JoinSet<()>) -> Vec<Message> {
    let timing = ctx.orchestrator.timing();
    let order: Vec<Personality> = {
        let mut rng = ctx.orchestrator.rng();
        response_order(&ctx.personalities, ctx.mode, &mut *rng)
            .into_iter()
            .cloned()
            .collect()
    };
    debug!(
        turn = ctx.turn,
        order = ?order.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        "Response order decided"
    );

    let mut responses = Vec::new();
    for (position, personality) in order.iter().enumerate() {
        let gap = {
            let mut rng = ctx.orchestrator.rng();
            timing.response_gap(position, ctx.complexity, &mut *rng)
        };
        if !ctx.pause(gap).await {
            break;
        }
        if !ctx.orchestrator.is_enabled(&personality.id) {
            continue;
        }

        ctx.orchestrator
            .set_status(&personality.id, ParticipantStatus::Thinking);
        let Some(content) = ctx.generate(personality, ResponseKind::Primary, None).await else {
            ctx.idle(&personality.id);
            break;
        };
        if !ctx.still_enabled(&personality.id) {
            continue;
        }

        let message = Message::new(&personality.id, content.text)
            .with_reference(&ctx.user_message.id)
            .with_confidence(content.confidence)
            .with_reasoning(content.reasoning);
        if !ctx.emit(&message) {
            ctx.idle(&personality.id);
            break;
        }
        ctx.idle(&personality.id);

        schedule_reactions(ctx, &message, reactions);
        responses.push(message);
    }
    responses
}

/// Decide, for every other participant, whether `parent` provokes an
/// interruption or a sub-response, and spawn the delayed reply.
fn schedule_reactions(ctx: &Arc<TurnContext>, parent: &Message, reactions: &mut JoinSet<()>) {
    let timing = ctx.orchestrator.timing();
    let settings = ctx.settings;
    if !settings.allow_interruptions && !settings.allow_sub_responses {
        return;
    }

    for other in &ctx.personalities {
        if other.id == parent.participant_id
            || !ctx.orchestrator.is_enabled(&other.id)
            || !other.is_triggered_by(&parent.content)
        {
            continue;
        }

        let (kind, delay) = {
            let mut rng = ctx.orchestrator.rng();
            let kind = if settings.allow_interruptions
                && rng.gen_bool(timing.interruption_probability(other.interruptiveness))
            {
                Some(MessageKind::Interruption)
            } else if settings.allow_sub_responses
                && rng.gen_bool(timing.sub_response_probability())
            {
                Some(MessageKind::SubResponse)
            } else {
                None
            };
            (kind, timing.reaction_delay(&mut *rng))
        };
        let Some(kind) = kind else {
            continue;
        };

        debug!(
            turn = ctx.turn,
            participant = %other.id,
            parent_id = %parent.id,
            kind = %kind,
            delay_ms = delay.as_millis() as u64,
            "Reaction scheduled"
        );

        let ctx = Arc::clone(ctx);
        let other = other.clone();
        let parent = parent.clone();
        reactions.spawn(async move {
            if !ctx.pause(delay).await || !ctx.orchestrator.is_enabled(&other.id) {
                return;
            }
            ctx.orchestrator
                .set_status(&other.id, ParticipantStatus::Thinking);
            let response_kind = if kind == MessageKind::Interruption {
                ResponseKind::Interruption
            } else {
                ResponseKind::SubResponse
            };
            let Some(content) = ctx.generate(&other, response_kind, Some(&parent)).await else {
                ctx.idle(&other.id);
                return;
            };
            if !ctx.still_enabled(&other.id) {
                return;
            }
            let message = Message::new(&other.id, content.text)
                .with_kind(kind)
                .with_parent(&parent.id)
                .with_reference(&parent.id)
                .with_confidence(content.confidence)
                .with_reasoning(content.reasoning);
            ctx.emit(&message);
            ctx.idle(&other.id);
        });
    }
}

/// Phase 3: decaying rounds of follow-up reactions.
async fn follow_up_phase(ctx: &Arc<TurnContext>, responses: &[Message]) {
    let timing = ctx.orchestrator.timing();
    let mut set = JoinSet::new();

    for (round, chance) in timing.follow_up_schedule().into_iter().enumerate() {
        let round = round as u32;
        for personality in &ctx.personalities {
            if !ctx.orchestrator.is_enabled(&personality.id) {
                continue;
            }
            let delay = {
                let mut rng = ctx.orchestrator.rng();
                if !rng.gen_bool(chance) {
                    continue;
                }
                timing.follow_up_delay(round, &mut *rng)
            };

            let cited = responses
                .iter()
                .find(|m| m.participant_id == personality.id)
                .map(|m| m.id.clone())
                .unwrap_or_else(|| ctx.user_message.id.clone());

            debug!(
                turn = ctx.turn,
                participant = %personality.id,
                round,
                chance,
                delay_ms = delay.as_millis() as u64,
                "Follow-up scheduled"
            );

            let ctx = Arc::clone(ctx);
            let personality = personality.clone();
            set.spawn(async move {
                if !ctx.pause(delay).await || !ctx.orchestrator.is_enabled(&personality.id) {
                    return;
                }
                ctx.orchestrator
                    .set_status(&personality.id, ParticipantStatus::Thinking);
                let Some(content) = ctx.generate(&personality, ResponseKind::FollowUp, None).await
                else {
                    ctx.idle(&personality.id);
                    return;
                };
                if !ctx.still_enabled(&personality.id) {
                    return;
                }
                let message = Message::new(&personality.id, content.text)
                    .with_kind(MessageKind::FollowUpReaction)
                    .with_reference(cited)
                    .with_confidence(content.confidence)
                    .with_reasoning(content.reasoning);
                ctx.emit(&message);
                ctx.idle(&personality.id);
            });
        }
    }

    while set.join_next().await.is_some() {}
}
