use serde::{Deserialize, Serialize};

/// Discussion mode of a turn.
///
/// The mode selects the response-ordering policy: confrontational modes put
/// the most interruptive participants first, all others shuffle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscussionMode {
    /// Participants build on each other.
    #[default]
    Collaborative,
    /// Quick, divergent idea generation.
    Brainstorm,
    /// Participants argue opposing positions.
    Debate,
    /// Every proposal is deliberately challenged.
    DevilsAdvocate,
    /// Question-driven exploration.
    Socratic,
    /// Participants converge on a shared answer.
    Consensus,
}

impl DiscussionMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscussionMode::Collaborative => "collaborative",
            DiscussionMode::Brainstorm => "brainstorm",
            DiscussionMode::Debate => "debate",
            DiscussionMode::DevilsAdvocate => "devils-advocate",
            DiscussionMode::Socratic => "socratic",
            DiscussionMode::Consensus => "consensus",
        }
    }

    /// Whether the mode orders responses by interruptiveness.
    pub fn is_confrontational(&self) -> bool {
        let name = self.as_str();
        name.contains("debate") || name.contains("devils-advocate")
    }

    /// All modes in display order.
    pub fn all() -> [DiscussionMode; 6] {
        [
            DiscussionMode::Collaborative,
            DiscussionMode::Brainstorm,
            DiscussionMode::Debate,
            DiscussionMode::DevilsAdvocate,
            DiscussionMode::Socratic,
            DiscussionMode::Consensus,
        ]
    }
}

impl std::fmt::Display for DiscussionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DiscussionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '\'')
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "collaborative" => Ok(DiscussionMode::Collaborative),
            "brainstorm" => Ok(DiscussionMode::Brainstorm),
            "debate" => Ok(DiscussionMode::Debate),
            "devils-advocate" => Ok(DiscussionMode::DevilsAdvocate),
            "socratic" => Ok(DiscussionMode::Socratic),
            "consensus" => Ok(DiscussionMode::Consensus),
            _ => Err(format!("Unknown discussion mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confrontational_modes() {
        assert!(DiscussionMode::Debate.is_confrontational());
        assert!(DiscussionMode::DevilsAdvocate.is_confrontational());
        assert!(!DiscussionMode::Collaborative.is_confrontational());
        assert!(!DiscussionMode::Brainstorm.is_confrontational());
        assert!(!DiscussionMode::Socratic.is_confrontational());
        assert!(!DiscussionMode::Consensus.is_confrontational());
    }

    #[test]
    fn test_mode_from_str_variants() {
        assert_eq!(
            "devil's-advocate".parse::<DiscussionMode>().unwrap(),
            DiscussionMode::DevilsAdvocate
        );
        assert_eq!(
            "Devils_Advocate".parse::<DiscussionMode>().unwrap(),
            DiscussionMode::DevilsAdvocate
        );
        assert_eq!(
            "DEBATE".parse::<DiscussionMode>().unwrap(),
            DiscussionMode::Debate
        );
    }

    #[test]
    fn test_mode_round_trips_through_as_str() {
        for mode in DiscussionMode::all() {
            assert_eq!(mode.as_str().parse::<DiscussionMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_from_str_invalid() {
        let result = "shouting".parse::<DiscussionMode>();
        assert_eq!(result.unwrap_err(), "Unknown discussion mode: shouting");
    }
}
