use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::orchestrator::{DiscussionMode, TurnSettings};
use crate::timing::TimingPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub chat: ChatConfig,
    pub timing: TimingPolicy,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Default turn parameters for a chat session
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub settings: TurnSettings,
    pub complexity: u8,
    pub mode: DiscussionMode,
    /// Seed for the orchestrator's random source; ambient randomness when unset.
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = TurnSettings::default();
        let mode = match env::var("CHAT_MODE") {
            Ok(raw) => raw
                .parse::<DiscussionMode>()
                .map_err(|message| AppError::Config { message })?,
            Err(_) => DiscussionMode::default(),
        };

        let chat = ChatConfig {
            settings: TurnSettings {
                show_thinking: env_flag("CHAT_SHOW_THINKING", defaults.show_thinking),
                allow_interruptions: env_flag(
                    "CHAT_ALLOW_INTERRUPTIONS",
                    defaults.allow_interruptions,
                ),
                allow_sub_responses: env_flag(
                    "CHAT_ALLOW_SUB_RESPONSES",
                    defaults.allow_sub_responses,
                ),
            },
            complexity: env_or("CHAT_COMPLEXITY", 5u8).clamp(1, 10),
            mode,
            seed: env::var("CHAT_SEED").ok().and_then(|s| s.parse().ok()),
        };

        Ok(Config {
            logging,
            chat,
            timing: TimingPolicy::from_env(),
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            settings: TurnSettings::default(),
            complexity: 5,
            mode: DiscussionMode::default(),
            seed: None,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key).map(|v| v.trim().to_lowercase()) {
        Ok(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => true,
        Ok(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_config_default() {
        let chat = ChatConfig::default();
        assert_eq!(chat.complexity, 5);
        assert!(chat.settings.show_thinking);
        assert!(chat.seed.is_none());
    }

    #[test]
    fn test_logging_config_default() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_or_missing_key_uses_default() {
        assert_eq!(env_or("PERSONA_CHORUS_TEST_UNSET_KEY", 17u32), 17);
        assert!(env_flag("PERSONA_CHORUS_TEST_UNSET_FLAG", true));
    }
}
