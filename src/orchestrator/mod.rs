//! Conversation orchestrator.
//!
//! Schedules one user turn as three phases of deferred work:
//!
//! 1. **Thinking**: staggered placeholders, one per participant.
//! 2. **Primary responses**: one message per participant in policy order,
//!    each possibly triggering interruptions or sub-responses.
//! 3. **Follow-ups**: decaying rounds of "circling back" reactions.
//!
//! All scheduled work of a session hangs off a single
//! [`CancellationToken`]; [`Orchestrator::cancel_all`] revokes it as a unit.
//! Every sink call goes through one emission gate that re-checks the token,
//! so sink calls never overlap and never fire after cancellation.

mod mode;
mod order;
mod phases;
mod sink;
mod turn;

pub use mode::*;
pub use order::*;
pub use sink::*;
pub use turn::*;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult, TurnError, TurnResult};
use crate::generator::ContentGenerator;
use crate::message::{Message, USER_PARTICIPANT_ID};
use crate::personas::{Participant, ParticipantStatus, Personality, PersonalityRegistry};
use crate::timing::TimingPolicy;

use phases::TurnContext;

struct Inner {
    registry: Arc<PersonalityRegistry>,
    generator: Arc<dyn ContentGenerator>,
    timing: TimingPolicy,
    rng: Mutex<StdRng>,
    roster: Mutex<Vec<Participant>>,
    scope: Mutex<CancellationToken>,
    gate: Mutex<()>,
    turns: AtomicU32,
}

/// The conversation scheduler.
///
/// Cheap to clone; clones share the roster, random source and cancellation
/// scope. Requires a running tokio runtime for [`begin_turn`](Self::begin_turn).
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Create an orchestrator over every persona in `registry`, using ambient randomness.
    pub fn new(
        registry: Arc<PersonalityRegistry>,
        generator: Arc<dyn ContentGenerator>,
        timing: TimingPolicy,
    ) -> Self {
        Self::with_rng(registry, generator, timing, StdRng::from_entropy())
    }

    /// Create an orchestrator whose scheduling randomness is reproducible.
    pub fn with_seed(
        registry: Arc<PersonalityRegistry>,
        generator: Arc<dyn ContentGenerator>,
        timing: TimingPolicy,
        seed: u64,
    ) -> Self {
        Self::with_rng(registry, generator, timing, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        registry: Arc<PersonalityRegistry>,
        generator: Arc<dyn ContentGenerator>,
        timing: TimingPolicy,
        rng: StdRng,
    ) -> Self {
        let roster = registry.participants();
        Self {
            inner: Arc::new(Inner {
                registry,
                generator,
                timing,
                rng: Mutex::new(rng),
                roster: Mutex::new(roster),
                scope: Mutex::new(CancellationToken::new()),
                gate: Mutex::new(()),
                turns: AtomicU32::new(0),
            }),
        }
    }

    /// Timing policy in use.
    pub fn timing(&self) -> &TimingPolicy {
        &self.inner.timing
    }

    /// Snapshot of the participant roster.
    pub fn participants(&self) -> Vec<Participant> {
        self.roster().clone()
    }

    /// Ids of participants that may currently be scheduled, in roster order.
    pub fn enabled_participant_ids(&self) -> Vec<String> {
        self.roster()
            .iter()
            .filter(|p| p.is_enabled())
            .map(|p| p.id.clone())
            .collect()
    }

    /// Current status of a participant.
    pub fn participant_status(&self, id: &str) -> Option<ParticipantStatus> {
        self.roster().iter().find(|p| p.id == id).map(|p| p.status)
    }

    /// User toggle. Disabling excludes the participant from every future
    /// scheduled action, including ones already pending in a running turn.
    pub fn set_participant_enabled(&self, id: &str, enabled: bool) -> SessionResult<()> {
        let mut roster = self.roster();
        let participant = roster
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SessionError::UnknownParticipant {
                participant_id: id.to_string(),
            })?;
        participant.status = if enabled {
            ParticipantStatus::Active
        } else {
            ParticipantStatus::Inactive
        };
        info!(participant = %id, enabled, "Participant toggled");
        Ok(())
    }

    /// Replace the roster with a fresh, all-active one from the registry.
    pub fn reset_participants(&self) {
        *self.roster() = self.inner.registry.participants();
    }

    /// Schedule a turn and return immediately.
    ///
    /// Validation happens before anything is scheduled: an empty prompt, a
    /// non-user author, an unknown participant, or no enabled participants
    /// reject the turn. `"user"` in the participant list is ignored.
    pub fn begin_turn(
        &self,
        request: TurnRequest,
        sink: Arc<dyn ConversationSink>,
    ) -> TurnResult<TurnHandle> {
        if request.user_message.content.trim().is_empty() {
            return Err(TurnError::EmptyPrompt);
        }
        if !request.user_message.is_from_user() {
            return Err(TurnError::NotUserMessage {
                participant_id: request.user_message.participant_id.clone(),
            });
        }

        let mut personalities: Vec<Personality> = Vec::new();
        {
            let roster = self.roster();
            for id in &request.participant_ids {
                if id == USER_PARTICIPANT_ID || personalities.iter().any(|p| &p.id == id) {
                    continue;
                }
                let personality = self.inner.registry.get(id).ok_or_else(|| {
                    TurnError::UnknownParticipant {
                        participant_id: id.clone(),
                    }
                })?;
                let enabled = roster.iter().any(|p| &p.id == id && p.is_enabled());
                if enabled {
                    personalities.push(personality);
                }
            }
        }
        if personalities.is_empty() {
            return Err(TurnError::NoActiveParticipants);
        }

        let turn = self.inner.turns.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.scope().child_token();
        let (settled_tx, settled_rx) = watch::channel(false);

        info!(
            turn,
            participants = personalities.len(),
            mode = %request.mode,
            complexity = request.complexity,
            "Turn scheduled"
        );

        let ctx = Arc::new(TurnContext::new(
            self.clone(),
            turn,
            token,
            sink,
            request,
            personalities,
        ));
        let task = tokio::spawn(phases::run_turn(ctx, settled_tx));
        Ok(TurnHandle::new(turn, settled_rx, task))
    }

    /// Revoke all scheduled work from every turn started so far.
    ///
    /// Messages already emitted stay emitted. No sink call fires for those
    /// turns once this returns. Idempotent, and later turns schedule normally.
    pub fn cancel_all(&self) {
        let _gate = self.gate();
        let previous = std::mem::replace(&mut *self.scope(), CancellationToken::new());
        let was_live = !previous.is_cancelled();
        previous.cancel();

        for participant in self.roster().iter_mut() {
            if participant.status == ParticipantStatus::Thinking {
                participant.status = ParticipantStatus::Active;
            }
        }
        if was_live {
            debug!("All scheduled conversation work cancelled");
        }
    }

    /// Deliver a message through the emission gate.
    ///
    /// Returns false, without calling the sink, once `token` is cancelled.
    pub(crate) fn emit(
        &self,
        token: &CancellationToken,
        sink: &dyn ConversationSink,
        message: &Message,
    ) -> bool {
        let _gate = self.gate();
        if token.is_cancelled() {
            return false;
        }
        sink.on_message(message);
        if let Some(parent_id) = &message.parent_id {
            sink.on_sub_response(message, parent_id);
        }
        true
    }

    pub(crate) fn is_enabled(&self, id: &str) -> bool {
        self.roster().iter().any(|p| p.id == id && p.is_enabled())
    }

    /// Status changes never override a user's disable toggle.
    pub(crate) fn set_status(&self, id: &str, status: ParticipantStatus) {
        if let Some(p) = self.roster().iter_mut().find(|p| p.id == id) {
            if p.status != ParticipantStatus::Inactive {
                p.status = status;
            }
        }
    }

    pub(crate) fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.inner.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn generator(&self) -> Arc<dyn ContentGenerator> {
        self.inner.generator.clone()
    }

    fn roster(&self) -> MutexGuard<'_, Vec<Participant>> {
        self.inner.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scope(&self) -> MutexGuard<'_, CancellationToken> {
        self.inner.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
