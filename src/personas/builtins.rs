//! Built-in personas for common discussion dynamics.

use super::{Interruptiveness, Personality, ThinkingSpeed};

/// All built-in personas in display order.
pub fn builtin_personalities() -> Vec<Personality> {
    vec![
        analyst_persona(),
        skeptic_persona(),
        visionary_persona(),
        pragmatist_persona(),
        empath_persona(),
    ]
}

/// Evidence-first analyst. Slow, rarely interrupts.
pub fn analyst_persona() -> Personality {
    Personality::new("analyst", "Ada")
        .with_role("Data Analyst")
        .with_display("📊", "#2f80ed")
        .with_speed(ThinkingSpeed::Slow)
        .with_interruptiveness(Interruptiveness::Low)
        .with_traits(0.6, 0.3)
        .with_triggers(["data", "evidence", "numbers", "measure", "percent", "study"])
        .with_thinking([
            "Checking what the numbers actually say...",
            "Looking for a baseline to compare against...",
            "Separating correlation from causation here...",
        ])
}

/// Contrarian who probes assumptions. Fast, interrupts often.
pub fn skeptic_persona() -> Personality {
    Personality::new("skeptic", "Sam")
        .with_role("Devil's Advocate")
        .with_display("🧐", "#eb5757")
        .with_speed(ThinkingSpeed::Fast)
        .with_interruptiveness(Interruptiveness::High)
        .with_traits(0.2, 0.5)
        .with_triggers(["always", "never", "obviously", "assume", "guarantee", "everyone"])
        .with_thinking([
            "Hunting for the hidden assumption...",
            "What would have to be true for this to fail?",
            "Playing out the worst case...",
        ])
}

/// Big-picture futurist. Medium speed, medium interruptiveness.
pub fn visionary_persona() -> Personality {
    Personality::new("visionary", "Vera")
        .with_role("Futurist")
        .with_display("🔭", "#9b51e0")
        .with_speed(ThinkingSpeed::Medium)
        .with_interruptiveness(Interruptiveness::Medium)
        .with_traits(0.7, 0.9)
        .with_triggers(["future", "imagine", "innovation", "vision", "scale", "new"])
        .with_thinking([
            "Zooming out ten years...",
            "Connecting this to an adjacent field...",
            "Asking what the bold version looks like...",
        ])
}

/// Delivery-focused pragmatist. Fast, medium interruptiveness.
pub fn pragmatist_persona() -> Personality {
    Personality::new("pragmatist", "Pat")
        .with_role("Engineering Lead")
        .with_display("🛠️", "#f2994a")
        .with_speed(ThinkingSpeed::Fast)
        .with_interruptiveness(Interruptiveness::Medium)
        .with_traits(0.5, 0.4)
        .with_triggers(["cost", "budget", "deadline", "practical", "implement", "ship"])
        .with_thinking([
            "Estimating what this takes to ship...",
            "Counting the moving parts...",
            "Looking for the smallest useful step...",
        ])
}

/// People-first empath. Slow, rarely interrupts.
pub fn empath_persona() -> Personality {
    Personality::new("empath", "Eli")
        .with_role("User Researcher")
        .with_display("💬", "#27ae60")
        .with_speed(ThinkingSpeed::Slow)
        .with_interruptiveness(Interruptiveness::Low)
        .with_traits(0.9, 0.6)
        .with_triggers(["people", "users", "team", "feel", "trust", "customer"])
        .with_thinking([
            "Thinking about who this affects most...",
            "Imagining the first five minutes as a new user...",
            "Listening for what's not being said...",
        ])
}
