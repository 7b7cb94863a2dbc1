use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Turn rejected: {0}")]
    Turn(#[from] TurnError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised synchronously by `begin_turn` before any work is scheduled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Turn must start from a user message, got author '{participant_id}'")]
    NotUserMessage { participant_id: String },

    #[error("No active participants to schedule")]
    NoActiveParticipants,

    #[error("Unknown participant: {participant_id}")]
    UnknownParticipant { participant_id: String },
}

/// Content generator failures, always recovered by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation failed for {participant_id}: {message}")]
    Failed {
        participant_id: String,
        message: String,
    },

    #[error("Generator returned empty content for {participant_id}")]
    Empty { participant_id: String },

    #[error("Generation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Presentation-side session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Message {message_id} is not a pending sub-response")]
    NotPendingSubResponse { message_id: String },

    #[error("Unknown participant: {participant_id}")]
    UnknownParticipant { participant_id: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for turn scheduling
pub type TurnResult<T> = Result<T, TurnError>;

/// Result type alias for content generation
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "bad mode".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: bad mode");

        let err = AppError::Internal {
            message: "unexpected".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_turn_error_display() {
        assert_eq!(TurnError::EmptyPrompt.to_string(), "Prompt cannot be empty");
        assert_eq!(
            TurnError::NoActiveParticipants.to_string(),
            "No active participants to schedule"
        );

        let err = TurnError::UnknownParticipant {
            participant_id: "ghost".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown participant: ghost");

        let err = TurnError::NotUserMessage {
            participant_id: "analyst".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Turn must start from a user message, got author 'analyst'"
        );
    }

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::Failed {
            participant_id: "skeptic".to_string(),
            message: "bank exhausted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Generation failed for skeptic: bank exhausted"
        );

        let err = GenerationError::Timeout { timeout_ms: 250 };
        assert_eq!(err.to_string(), "Generation timed out after 250ms");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::NotPendingSubResponse {
            message_id: "msg-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Message msg-1 is not a pending sub-response"
        );

        let err = SessionError::MessageNotFound {
            message_id: "msg-2".to_string(),
        };
        assert_eq!(err.to_string(), "Message not found: msg-2");
    }

    #[test]
    fn test_turn_error_conversion_to_app_error() {
        let app_err: AppError = TurnError::EmptyPrompt.into();
        assert!(matches!(app_err, AppError::Turn(TurnError::EmptyPrompt)));
        assert!(app_err.to_string().contains("Prompt cannot be empty"));
    }

    #[test]
    fn test_session_error_conversion_to_app_error() {
        let app_err: AppError = SessionError::MessageNotFound {
            message_id: "x".to_string(),
        }
        .into();
        assert!(matches!(app_err, AppError::Session(_)));
    }

    #[test]
    fn test_generation_error_conversion_to_app_error() {
        let app_err: AppError = GenerationError::Timeout { timeout_ms: 10 }.into();
        assert!(matches!(app_err, AppError::Generation(_)));
    }
}
