//! Timing policy for the conversation orchestrator.
//!
//! Named delay ranges and probabilities that parameterize scheduling. The
//! policy is pure data; every random draw takes the caller's random source so
//! that scheduling stays reproducible under a seeded generator.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::env_or;
use crate::personas::{Interruptiveness, ThinkingSpeed};

/// Inclusive range of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds.
    pub max_ms: u64,
}

impl DelayRange {
    /// Create a range; bounds are swapped if given in the wrong order.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    /// Draw a value in the range.
    pub fn sample_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            rng.gen_range(self.min_ms..=self.max_ms)
        }
    }

    /// Draw a duration in the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(self.sample_ms(rng))
    }

    fn from_env(prefix: &str, default: DelayRange) -> Self {
        Self::new(
            env_or(&format!("{}_MIN_MS", prefix), default.min_ms),
            env_or(&format!("{}_MAX_MS", prefix), default.max_ms),
        )
    }
}

/// Scheduling parameters for a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Offset added per participant index before its thinking bubble appears.
    pub thinking_stagger_ms: u64,
    /// Random jitter added on top of the stagger.
    pub thinking_jitter: DelayRange,
    /// Base thinking duration before speed weighting.
    pub thinking_delay: DelayRange,
    /// Thinking multiplier for fast personas.
    pub fast_multiplier: f64,
    /// Thinking multiplier for medium personas.
    pub medium_multiplier: f64,
    /// Thinking multiplier for slow personas.
    pub slow_multiplier: f64,
    /// Gap before the first primary response.
    pub first_response_gap_ms: u64,
    /// Gap before each later primary response.
    pub response_gap: DelayRange,
    /// Extra delay per complexity level, applied to every response gap.
    pub complexity_step_ms: u64,
    /// Base probability that a triggered reaction is an interruption.
    pub interruption_chance: f64,
    /// Probability that a triggered reaction becomes a sub-response.
    pub sub_response_chance: f64,
    /// Delay before an interruption or sub-response is emitted.
    pub reaction_delay: DelayRange,
    /// Maximum number of follow-up rounds.
    pub follow_up_rounds: u32,
    /// Continuation probability of the first follow-up round.
    pub follow_up_initial_chance: f64,
    /// Geometric decay applied to the continuation probability per round.
    pub follow_up_decay: f64,
    /// Follow-up phase stops once the probability falls below this floor.
    pub follow_up_floor: f64,
    /// Delay before a follow-up message, per round.
    pub follow_up_delay: DelayRange,
    /// Offset added per follow-up round.
    pub follow_up_round_spacing_ms: u64,
    /// Deadline for a single content generator call.
    pub generation_timeout_ms: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            thinking_stagger_ms: 350,
            thinking_jitter: DelayRange::new(0, 250),
            thinking_delay: DelayRange::new(1500, 3000),
            fast_multiplier: 0.6,
            medium_multiplier: 1.0,
            slow_multiplier: 1.5,
            first_response_gap_ms: 300,
            response_gap: DelayRange::new(1200, 3500),
            complexity_step_ms: 150,
            interruption_chance: 0.3,
            sub_response_chance: 0.5,
            reaction_delay: DelayRange::new(800, 2500),
            follow_up_rounds: 3,
            follow_up_initial_chance: 0.4,
            follow_up_decay: 0.6,
            follow_up_floor: 0.1,
            follow_up_delay: DelayRange::new(2000, 5000),
            follow_up_round_spacing_ms: 3000,
            generation_timeout_ms: 10_000,
        }
    }
}

impl TimingPolicy {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            thinking_stagger_ms: env_or("TIMING_THINKING_STAGGER_MS", d.thinking_stagger_ms),
            thinking_jitter: DelayRange::from_env("TIMING_THINKING_JITTER", d.thinking_jitter),
            thinking_delay: DelayRange::from_env("TIMING_THINKING_DELAY", d.thinking_delay),
            fast_multiplier: env_or("TIMING_FAST_MULTIPLIER", d.fast_multiplier),
            medium_multiplier: env_or("TIMING_MEDIUM_MULTIPLIER", d.medium_multiplier),
            slow_multiplier: env_or("TIMING_SLOW_MULTIPLIER", d.slow_multiplier),
            first_response_gap_ms: env_or("TIMING_FIRST_RESPONSE_GAP_MS", d.first_response_gap_ms),
            response_gap: DelayRange::from_env("TIMING_RESPONSE_GAP", d.response_gap),
            complexity_step_ms: env_or("TIMING_COMPLEXITY_STEP_MS", d.complexity_step_ms),
            interruption_chance: probability(env_or(
                "TIMING_INTERRUPTION_CHANCE",
                d.interruption_chance,
            )),
            sub_response_chance: probability(env_or(
                "TIMING_SUB_RESPONSE_CHANCE",
                d.sub_response_chance,
            )),
            reaction_delay: DelayRange::from_env("TIMING_REACTION_DELAY", d.reaction_delay),
            follow_up_rounds: env_or("TIMING_FOLLOW_UP_ROUNDS", d.follow_up_rounds),
            follow_up_initial_chance: probability(env_or(
                "TIMING_FOLLOW_UP_INITIAL_CHANCE",
                d.follow_up_initial_chance,
            )),
            follow_up_decay: probability(env_or("TIMING_FOLLOW_UP_DECAY", d.follow_up_decay)),
            follow_up_floor: probability(env_or("TIMING_FOLLOW_UP_FLOOR", d.follow_up_floor)),
            follow_up_delay: DelayRange::from_env("TIMING_FOLLOW_UP_DELAY", d.follow_up_delay),
            follow_up_round_spacing_ms: env_or(
                "TIMING_FOLLOW_UP_ROUND_SPACING_MS",
                d.follow_up_round_spacing_ms,
            ),
            generation_timeout_ms: env_or("TIMING_GENERATION_TIMEOUT_MS", d.generation_timeout_ms),
        }
    }

    /// A policy with every delay set to zero. Probabilities keep their defaults.
    pub fn instant() -> Self {
        let zero = DelayRange::new(0, 0);
        Self {
            thinking_stagger_ms: 0,
            thinking_jitter: zero,
            thinking_delay: zero,
            first_response_gap_ms: 0,
            response_gap: zero,
            complexity_step_ms: 0,
            reaction_delay: zero,
            follow_up_delay: zero,
            follow_up_round_spacing_ms: 0,
            ..Self::default()
        }
    }

    /// Set both reaction probabilities
    pub fn with_reaction_chances(mut self, interruption: f64, sub_response: f64) -> Self {
        self.interruption_chance = probability(interruption);
        self.sub_response_chance = probability(sub_response);
        self
    }

    /// Set the follow-up starting probability
    pub fn with_follow_up_chance(mut self, chance: f64) -> Self {
        self.follow_up_initial_chance = probability(chance);
        self
    }

    /// Thinking multiplier for a speed class.
    pub fn speed_multiplier(&self, speed: ThinkingSpeed) -> f64 {
        match speed {
            ThinkingSpeed::Fast => self.fast_multiplier,
            ThinkingSpeed::Medium => self.medium_multiplier,
            ThinkingSpeed::Slow => self.slow_multiplier,
        }
    }

    /// Delay before participant `index`'s thinking bubble appears.
    pub fn thinking_stagger<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Duration {
        let base = self.thinking_stagger_ms.saturating_mul(index as u64);
        Duration::from_millis(base.saturating_add(self.thinking_jitter.sample_ms(rng)))
    }

    /// Personality-weighted thinking duration.
    pub fn thinking_delay<R: Rng + ?Sized>(&self, speed: ThinkingSpeed, rng: &mut R) -> Duration {
        let base = self.thinking_delay.sample_ms(rng) as f64;
        Duration::from_millis((base * self.speed_multiplier(speed).max(0.0)).round() as u64)
    }

    /// Gap before the response at `position` in the response order.
    ///
    /// The first gap is a small constant, later gaps are drawn from the wider
    /// range. Both grow linearly with complexity.
    pub fn response_gap<R: Rng + ?Sized>(
        &self,
        position: usize,
        complexity: u8,
        rng: &mut R,
    ) -> Duration {
        let base = if position == 0 {
            self.first_response_gap_ms
        } else {
            self.response_gap.sample_ms(rng)
        };
        let stretch = self.complexity_step_ms.saturating_mul(u64::from(complexity));
        Duration::from_millis(base.saturating_add(stretch))
    }

    /// Probability that a triggered reaction from a persona is an interruption.
    pub fn interruption_probability(&self, level: Interruptiveness) -> f64 {
        probability(self.interruption_chance * f64::from(level.score()) / 3.0)
    }

    /// Probability that a triggered, non-interrupting persona branches into a sub-response.
    pub fn sub_response_probability(&self) -> f64 {
        probability(self.sub_response_chance)
    }

    /// Delay before an interruption or sub-response.
    pub fn reaction_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.reaction_delay.sample(rng)
    }

    /// Delay before a follow-up scheduled in `round` (0-based).
    pub fn follow_up_delay<R: Rng + ?Sized>(&self, round: u32, rng: &mut R) -> Duration {
        let offset = self
            .follow_up_round_spacing_ms
            .saturating_mul(u64::from(round));
        Duration::from_millis(offset.saturating_add(self.follow_up_delay.sample_ms(rng)))
    }

    /// Continuation probability for each follow-up round that will run.
    ///
    /// Starts at the initial chance and decays geometrically, stopping at the
    /// round cap or as soon as the probability drops below the floor.
    pub fn follow_up_schedule(&self) -> Vec<f64> {
        let mut chances = Vec::new();
        let mut chance = self.follow_up_initial_chance;
        for _ in 0..self.follow_up_rounds {
            if chance < self.follow_up_floor || chance <= 0.0 {
                break;
            }
            chances.push(probability(chance));
            chance *= self.follow_up_decay;
        }
        chances
    }

    /// Generator deadline as a duration.
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

fn probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delay_range_swaps_bounds() {
        let range = DelayRange::new(500, 100);
        assert_eq!(range.min_ms, 100);
        assert_eq!(range.max_ms, 500);
    }

    #[test]
    fn test_delay_range_sample_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = DelayRange::new(100, 200);
        for _ in 0..100 {
            let v = range.sample_ms(&mut rng);
            assert!((100..=200).contains(&v));
        }
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(DelayRange::new(42, 42).sample_ms(&mut rng), 42);
    }

    #[test]
    fn test_speed_ordering() {
        let policy = TimingPolicy::default();
        let fast = policy.speed_multiplier(ThinkingSpeed::Fast);
        let medium = policy.speed_multiplier(ThinkingSpeed::Medium);
        let slow = policy.speed_multiplier(ThinkingSpeed::Slow);
        assert!(fast < medium);
        assert!(medium < slow);
    }

    #[test]
    fn test_thinking_delay_scales_with_speed() {
        let policy = TimingPolicy {
            thinking_delay: DelayRange::new(1000, 1000),
            ..TimingPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut delay = |speed| policy.thinking_delay(speed, &mut rng);
        assert_eq!(delay(ThinkingSpeed::Fast), Duration::from_millis(600));
        assert_eq!(delay(ThinkingSpeed::Medium), Duration::from_millis(1000));
        assert_eq!(delay(ThinkingSpeed::Slow), Duration::from_millis(1500));
    }

    #[test]
    fn test_thinking_stagger_grows_with_index() {
        let policy = TimingPolicy {
            thinking_jitter: DelayRange::new(0, 0),
            ..TimingPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.thinking_stagger(0, &mut rng), Duration::ZERO);
        assert_eq!(policy.thinking_stagger(2, &mut rng), Duration::from_millis(700));
    }

    #[test]
    fn test_first_response_gap_is_constant_plus_complexity() {
        let policy = TimingPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(policy.response_gap(0, 1, &mut rng), Duration::from_millis(450));
        assert_eq!(policy.response_gap(0, 10, &mut rng), Duration::from_millis(1800));
    }

    #[test]
    fn test_later_response_gap_uses_range() {
        let policy = TimingPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let gap = policy.response_gap(2, 4, &mut rng).as_millis() as u64;
            assert!((1200 + 600..=3500 + 600).contains(&gap));
        }
    }

    #[test]
    fn test_follow_up_schedule_decays() {
        let policy = TimingPolicy::default();
        let schedule = policy.follow_up_schedule();
        assert_eq!(schedule.len(), 3);
        assert!((schedule[0] - 0.4).abs() < 1e-9);
        assert!((schedule[1] - 0.24).abs() < 1e-9);
        assert!((schedule[2] - 0.144).abs() < 1e-9);
    }

    #[test]
    fn test_follow_up_schedule_stops_below_floor() {
        let policy = TimingPolicy {
            follow_up_rounds: 10,
            ..TimingPolicy::default()
        };
        let schedule = policy.follow_up_schedule();
        // 0.4, 0.24, 0.144, then 0.0864 < 0.1
        assert_eq!(schedule.len(), 3);

        let silent = TimingPolicy::default().with_follow_up_chance(0.05);
        assert!(silent.follow_up_schedule().is_empty());
    }

    #[test]
    fn test_interruption_probability_weighted() {
        let policy = TimingPolicy::default().with_reaction_chances(0.9, 0.5);
        assert!((policy.interruption_probability(Interruptiveness::High) - 0.9).abs() < 1e-9);
        assert!((policy.interruption_probability(Interruptiveness::Low) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_probability_clamped() {
        let policy = TimingPolicy::default().with_reaction_chances(1.5, -1.0);
        assert_eq!(policy.interruption_chance, 1.0);
        assert_eq!(policy.sub_response_chance, 0.0);
        assert_eq!(probability(f64::NAN), 0.0);
    }

    #[test]
    fn test_instant_policy_has_zero_delays() {
        let policy = TimingPolicy::instant();
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(policy.thinking_stagger(3, &mut rng), Duration::ZERO);
        assert_eq!(policy.response_gap(1, 10, &mut rng), Duration::ZERO);
        assert_eq!(policy.follow_up_delay(2, &mut rng), Duration::ZERO);
    }
}
