//! Canned response banks standing in for a language model.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{ContentGenerator, GeneratedContent, GenerationRequest, ResponseKind};
use crate::error::{GenerationError, GenerationResult};

const AGREEING_PRIMARY: &[&str] = &[
    "I like where {topic} is heading. The data we have points the same way, so let's build on it.",
    "On {topic}, I'd back the straightforward option first and measure the result before we scale it.",
    "There's a lot to work with in {topic}. If we keep the people using it at the center, the rest follows.",
    "{topic} is a good question. My instinct is to start small, ship something practical, and learn.",
];

const CHALLENGING_PRIMARY: &[&str] = &[
    "I'm not convinced about {topic}. We always assume the easy path works, and it rarely does.",
    "Before we commit to {topic}, what's the evidence? I'd want numbers, not anecdotes.",
    "Everyone seems to treat {topic} as obvious. What happens if the core assumption is wrong?",
    "{topic} sounds great until we look at the cost and the deadline. Something has to give.",
];

const CREATIVE_PRIMARY: &[&str] = &[
    "Imagine {topic} five years from now. The new version of this barely resembles today's.",
    "What if we flipped {topic} entirely? The innovation might be in what we stop doing.",
    "{topic} reminds me of how other fields solved this. There's a vision here worth chasing.",
];

const INTERRUPTIONS: &[&str] = &[
    "Sorry to cut in, {other}, but that point needs challenging before we go further.",
    "Hold on, {other}. I think we're skipping over something important there.",
    "Wait, {other}, can we pause on that? I see it differently.",
];

const AGREEING_REPLIES: &[&str] = &[
    "Building on what {other} said, that fits what I've seen with users too.",
    "Agreed with {other} here. I'd add that we should measure it early.",
    "{other} makes a fair point, and it lines up with the practical constraints.",
];

const CHALLENGING_REPLIES: &[&str] = &[
    "I'd push back on {other} a little. That never holds once real budgets get involved.",
    "{other}, I'm not sure the evidence supports that yet.",
    "Respectfully, {other}, that assumes everyone behaves the same way.",
];

const FOLLOW_UPS: &[&str] = &[
    "Circling back to {topic}: I've been thinking about it more, and I'd adjust my earlier take slightly.",
    "Coming back to this. After hearing everyone, I think our disagreement on {topic} is smaller than it looked.",
    "One more thought on {topic} before we move on: let's write down what would change our minds.",
];

/// Content generator that draws from fixed response banks.
///
/// Tone follows the persona: low agreeableness favors challenging lines,
/// high creativity favors speculative ones.
pub struct CannedGenerator {
    rng: Mutex<StdRng>,
}

impl CannedGenerator {
    /// Create a generator seeded from entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a deterministic generator.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick_bank(request: &GenerationRequest, roll: f64) -> &'static [&'static str] {
        let p = &request.personality;
        let challenging = request.mode.is_confrontational() || roll > p.agreeableness;
        match request.kind {
            ResponseKind::Primary if roll < p.creativity * 0.5 => CREATIVE_PRIMARY,
            ResponseKind::Primary if challenging => CHALLENGING_PRIMARY,
            ResponseKind::Primary => AGREEING_PRIMARY,
            ResponseKind::Interruption => INTERRUPTIONS,
            ResponseKind::SubResponse if challenging => CHALLENGING_REPLIES,
            ResponseKind::SubResponse => AGREEING_REPLIES,
            ResponseKind::FollowUp => FOLLOW_UPS,
        }
    }
}

impl Default for CannedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for CannedGenerator {
    async fn generate(&self, request: GenerationRequest) -> GenerationResult<GeneratedContent> {
        let (template, confidence) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let roll: f64 = rng.gen();
            let bank = Self::pick_bank(&request, roll);
            let template = bank.choose(&mut *rng).copied().ok_or_else(|| {
                GenerationError::Failed {
                    participant_id: request.personality.id.clone(),
                    message: "response bank is empty".to_string(),
                }
            })?;
            let spread = 0.35 * (1.0 - request.personality.creativity);
            (template, 0.55 + rng.gen_range(0.0..=0.1) + spread)
        };

        let other = request
            .replying_to
            .as_ref()
            .map(|r| r.participant_id.as_str())
            .unwrap_or("everyone");
        let text = template
            .replace("{topic}", &summarize_topic(&request.prompt))
            .replace("{other}", other);

        debug!(
            persona = %request.personality.id,
            kind = ?request.kind,
            "Canned content generated"
        );

        Ok(GeneratedContent::new(
            text,
            confidence,
            format!(
                "{} ({}) responding in {} mode",
                request.personality.name, request.personality.role, request.mode
            ),
        ))
    }
}

/// First few words of the prompt, used as the topic phrase.
fn summarize_topic(prompt: &str) -> String {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    let mut topic = words.iter().take(8).copied().collect::<Vec<_>>().join(" ");
    topic = topic
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_string();
    if words.len() > 8 {
        topic.push_str("...");
    }
    if topic.is_empty() {
        "this".to_string()
    } else {
        format!("\"{}\"", topic)
    }
}
