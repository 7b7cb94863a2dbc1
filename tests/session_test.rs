//! Chat session integration tests: approval workflow, reset and snapshots.

use std::sync::Arc;
use std::time::Duration;

use persona_chorus::error::SessionError;
use persona_chorus::personas::ParticipantStatus;
use persona_chorus::{
    CannedGenerator, ChatSession, DiscussionMode, Message, MessageKind, Orchestrator,
    PersonalityRegistry, SessionSnapshot, TimingPolicy, TurnSettings,
};
use pretty_assertions::assert_eq;

/// Every triggered reaction is a sub-response; no follow-ups.
fn branching_session(seed: u64) -> ChatSession {
    let timing = TimingPolicy::default()
        .with_reaction_chances(0.0, 1.0)
        .with_follow_up_chance(0.0);
    let orchestrator = Orchestrator::with_seed(
        Arc::new(PersonalityRegistry::new()),
        Arc::new(CannedGenerator::with_seed(seed)),
        timing,
        seed,
    );
    ChatSession::new(orchestrator)
}

fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.clone()).collect()
}

const PROMPT: &str = "Imagine the future: new data says our team always misses the budget deadline";

#[tokio::test(start_paused = true)]
async fn test_turn_populates_history_without_placeholders() {
    let mut session = branching_session(1);
    let handle = session.submit(PROMPT).unwrap();
    handle.join().await.unwrap();
    session.pump();

    let messages = session.messages();
    assert_eq!(messages[0].participant_id, "user");
    assert!(messages.iter().all(|m| !m.is_thinking()));
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.kind == MessageKind::Message && !m.is_from_user())
            .count(),
        5
    );
    assert_eq!(session.turns(), 1);
    assert_eq!(session.tree().len(), messages.len());
}

#[tokio::test(start_paused = true)]
async fn test_approve_and_reject_sub_responses() {
    // Some seed will produce at least two sub-responses for this prompt.
    let mut session = None;
    for seed in 0..20 {
        let mut candidate = branching_session(seed);
        candidate.submit(PROMPT).unwrap().join().await.unwrap();
        candidate.pump();
        if candidate.pending_sub_responses().len() >= 2 {
            session = Some(candidate);
            break;
        }
    }
    let mut session = session.expect("a seed producing two sub-responses");

    let pending: Vec<String> = session
        .pending_sub_responses()
        .iter()
        .map(|m| m.id.clone())
        .collect();
    let (keep, discard) = (&pending[0], &pending[1]);
    let total = session.messages().len();

    let approved = session.approve_sub_response(keep).unwrap();
    assert_eq!(approved.kind, MessageKind::Message);
    assert_eq!(approved.approved, Some(true));
    assert!(approved.parent_id.is_some());

    let rejected = session.reject_sub_response(discard).unwrap();
    assert_eq!(&rejected.id, discard);
    assert_eq!(session.messages().len(), total - 1);
    assert!(session.messages().iter().all(|m| &m.id != discard));

    assert!(matches!(
        session.approve_sub_response(keep),
        Err(SessionError::NotPendingSubResponse { .. })
    ));
    assert!(matches!(
        session.reject_sub_response(discard),
        Err(SessionError::MessageNotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_participant_stays_silent() {
    let mut session = branching_session(4);
    assert!(!session.toggle_participant("skeptic").unwrap());

    let summary = session.submit(PROMPT).unwrap().join().await.unwrap();
    session.pump();

    assert_eq!(summary.responses, 4);
    assert!(session
        .messages()
        .iter()
        .all(|m| m.participant_id != "skeptic"));
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_and_clears() {
    let mut session = branching_session(2);
    let handle = session.submit(PROMPT).unwrap();
    session.toggle_participant("empath").unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    session.reset();

    let summary = handle.join().await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(session.pump(), 0);
    assert!(session.messages().is_empty());
    assert_eq!(session.turns(), 0);

    // The user's toggle survives; nobody is left thinking.
    for participant in session.participants() {
        let expected = if participant.id == "empath" {
            ParticipantStatus::Inactive
        } else {
            ParticipantStatus::Active
        };
        assert_eq!(participant.status, expected, "{}", participant.id);
    }

    // The session is usable again after a reset, still without empath.
    let summary = session.submit("Fresh start").unwrap().join().await.unwrap();
    session.pump();
    assert_eq!(summary.responses, 4);
    assert!(session.messages().len() > 1);
    assert!(session
        .messages()
        .iter()
        .all(|m| m.participant_id != "empath"));
}

#[tokio::test(start_paused = true)]
async fn test_disabling_mid_turn_clears_placeholder() {
    let mut session = branching_session(8);
    session.set_mode(DiscussionMode::Debate);
    let handle = session.submit(PROMPT).unwrap();

    // Long enough for every thinking placeholder, short of any response.
    tokio::time::sleep(Duration::from_millis(1700)).await;
    session.pump();
    let thinking = session.messages().iter().filter(|m| m.is_thinking()).count();
    assert_eq!(thinking, 5);

    session.toggle_participant("analyst").unwrap();
    assert!(session
        .messages()
        .iter()
        .all(|m| !(m.is_thinking() && m.participant_id == "analyst")));

    let summary = handle.join().await.unwrap();
    session.pump();
    assert_eq!(summary.responses, 4);
    assert!(session.messages().iter().all(|m| !m.is_thinking()));
    assert!(session.snapshot().messages.iter().all(|m| m.is_complete));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_clears_placeholders_on_pump() {
    let mut session = branching_session(3);
    let handle = session.submit(PROMPT).unwrap();

    tokio::time::sleep(Duration::from_millis(1700)).await;
    session.pump();
    assert!(session.messages().iter().any(|m| m.is_thinking()));

    session.orchestrator().cancel_all();
    let summary = handle.join().await.unwrap();
    assert!(summary.cancelled);

    session.pump();
    assert!(session.messages().iter().all(|m| !m.is_thinking()));
    assert!(session.snapshot().messages.iter().all(|m| !m.is_thinking()));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_round_trip() {
    let mut session = branching_session(6);
    session.set_mode(DiscussionMode::Debate);
    session.set_settings(TurnSettings {
        show_thinking: false,
        ..TurnSettings::default()
    });
    session.toggle_participant("analyst").unwrap();
    session.submit(PROMPT).unwrap().join().await.unwrap();
    session.pump();

    let snapshot = session.snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let decoded: SessionSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.session_id, snapshot.session_id);
    assert_eq!(decoded.participants, snapshot.participants);
    assert_eq!(decoded.settings, snapshot.settings);
    assert_eq!(ids(&decoded.messages), ids(&snapshot.messages));

    let mut restored = branching_session(99);
    restored.restore(decoded);

    assert_eq!(restored.id(), session.id());
    assert_eq!(ids(restored.messages()), ids(session.messages()));
    assert_eq!(restored.turns(), 1);
    assert_eq!(restored.mode(), DiscussionMode::Debate);
    assert!(!restored.settings().show_thinking);
    assert_eq!(
        restored.orchestrator().participant_status("analyst"),
        Some(ParticipantStatus::Inactive)
    );
    assert_eq!(restored.tree().len(), session.tree().len());
}
