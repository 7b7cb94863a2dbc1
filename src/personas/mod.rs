//! Personality registry and participant types.
//!
//! A [`Personality`] is static behavioral data describing how a simulated
//! participant thinks, interrupts and reacts. A [`Participant`] is the
//! session-scoped instance created from it, carrying a mutable status.

mod builtins;
mod registry;

pub use builtins::*;
pub use registry::*;

use serde::{Deserialize, Serialize};

/// How quickly a participant finishes thinking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingSpeed {
    /// Shorter than the base thinking delay.
    Fast,
    /// The base thinking delay.
    #[default]
    Medium,
    /// Longer than the base thinking delay.
    Slow,
}

impl ThinkingSpeed {
    /// Get the speed name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ThinkingSpeed::Fast => "fast",
            ThinkingSpeed::Medium => "medium",
            ThinkingSpeed::Slow => "slow",
        }
    }
}

impl std::fmt::Display for ThinkingSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How readily a participant cuts into other participants' messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interruptiveness {
    /// Rarely interrupts.
    Low,
    /// Sometimes interrupts.
    #[default]
    Medium,
    /// Interrupts often and speaks early in confrontational modes.
    High,
}

impl Interruptiveness {
    /// Ordering score: high=3, medium=2, low=1.
    pub fn score(&self) -> u8 {
        match self {
            Interruptiveness::Low => 1,
            Interruptiveness::Medium => 2,
            Interruptiveness::High => 3,
        }
    }

    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Interruptiveness::Low => "low",
            Interruptiveness::Medium => "medium",
            Interruptiveness::High => "high",
        }
    }
}

impl std::fmt::Display for Interruptiveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Behavioral description of a simulated participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Unique persona identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short role description.
    pub role: String,
    /// Avatar glyph for display.
    pub avatar: String,
    /// Display color (hex).
    pub color: String,
    /// Thinking speed class.
    pub thinking_speed: ThinkingSpeed,
    /// Interruptiveness class.
    pub interruptiveness: Interruptiveness,
    /// Tendency to agree (0.0-1.0).
    pub agreeableness: f64,
    /// Tendency toward unconventional ideas (0.0-1.0).
    pub creativity: f64,
    /// Keywords that make this persona want to react to a message.
    pub trigger_keywords: Vec<String>,
    /// Reasoning lines shown while the persona is thinking.
    pub thinking_templates: Vec<String>,
}

impl Personality {
    /// Create a personality with default behavior.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: String::new(),
            avatar: String::new(),
            color: "#888888".to_string(),
            thinking_speed: ThinkingSpeed::default(),
            interruptiveness: Interruptiveness::default(),
            agreeableness: 0.5,
            creativity: 0.5,
            trigger_keywords: Vec::new(),
            thinking_templates: Vec::new(),
        }
    }

    /// Set the role description
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Set avatar and color
    pub fn with_display(mut self, avatar: impl Into<String>, color: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self.color = color.into();
        self
    }

    /// Set thinking speed
    pub fn with_speed(mut self, speed: ThinkingSpeed) -> Self {
        self.thinking_speed = speed;
        self
    }

    /// Set interruptiveness
    pub fn with_interruptiveness(mut self, level: Interruptiveness) -> Self {
        self.interruptiveness = level;
        self
    }

    /// Set agreeableness and creativity (clamped to 0.0-1.0)
    pub fn with_traits(mut self, agreeableness: f64, creativity: f64) -> Self {
        self.agreeableness = agreeableness.clamp(0.0, 1.0);
        self.creativity = creativity.clamp(0.0, 1.0);
        self
    }

    /// Set trigger keywords
    pub fn with_triggers<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set thinking templates
    pub fn with_thinking<I, S>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.thinking_templates = templates.into_iter().map(Into::into).collect();
        self
    }

    /// Whether any trigger keyword occurs in `content`, ignoring case.
    pub fn is_triggered_by(&self, content: &str) -> bool {
        let haystack = content.to_lowercase();
        self.trigger_keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .any(|k| haystack.contains(&k.to_lowercase()))
    }
}

/// Scheduling status of a participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Available for scheduling.
    #[default]
    Active,
    /// Currently preparing a message.
    Thinking,
    /// Disabled by the user; never scheduled.
    Inactive,
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantStatus::Active => write!(f, "active"),
            ParticipantStatus::Thinking => write!(f, "thinking"),
            ParticipantStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Session-scoped participant built from a [`Personality`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Persona identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role description.
    pub role: String,
    /// Avatar glyph.
    pub avatar: String,
    /// Display color.
    pub color: String,
    /// Current scheduling status.
    pub status: ParticipantStatus,
}

impl Participant {
    /// Whether the participant may be scheduled.
    pub fn is_enabled(&self) -> bool {
        self.status != ParticipantStatus::Inactive
    }
}

impl From<&Personality> for Participant {
    fn from(p: &Personality) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            role: p.role.clone(),
            avatar: p.avatar.clone(),
            color: p.color.clone(),
            status: ParticipantStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interruptiveness_score() {
        assert_eq!(Interruptiveness::High.score(), 3);
        assert_eq!(Interruptiveness::Medium.score(), 2);
        assert_eq!(Interruptiveness::Low.score(), 1);
    }

    #[test]
    fn test_trigger_match_is_case_insensitive() {
        let p = Personality::new("skeptic", "Sam").with_triggers(["Always", "assume"]);
        assert!(p.is_triggered_by("We ALWAYS do it this way"));
        assert!(p.is_triggered_by("let's assume the best"));
        assert!(!p.is_triggered_by("nothing relevant here"));
    }

    #[test]
    fn test_blank_trigger_never_matches() {
        let p = Personality::new("x", "X").with_triggers(["", "  "]);
        assert!(!p.is_triggered_by("anything at all"));
    }

    #[test]
    fn test_traits_clamped() {
        let p = Personality::new("x", "X").with_traits(1.4, -0.3);
        assert_eq!(p.agreeableness, 1.0);
        assert_eq!(p.creativity, 0.0);
    }

    #[test]
    fn test_participant_from_personality() {
        let p = Personality::new("visionary", "Vera")
            .with_role("Futurist")
            .with_display("V", "#aa00ff");
        let participant = Participant::from(&p);
        assert_eq!(participant.id, "visionary");
        assert_eq!(participant.role, "Futurist");
        assert_eq!(participant.status, ParticipantStatus::Active);
        assert!(participant.is_enabled());
    }
}
