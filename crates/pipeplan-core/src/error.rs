//! Error taxonomy for Pipeplan.
//!
//! Configuration errors are fatal and surface at construction time.
//! Per-request failures never escape as errors; they are folded into a
//! [`PlanOutcome`](crate::orchestrator::PlanOutcome).

/// Fatal configuration errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("invalid allowlist pattern in set '{set}': {pattern}: {source}")]
    InvalidPattern {
        set: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid allowlist mode '{0}' (expected 'strict' or 'off')")]
    InvalidMode(String),

    #[error("invalid planner configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid context: {0}")]
    InvalidContext(String),
}

/// Errors produced while decoding untrusted generator output.
#[derive(Debug, thiserror::Error)]
pub enum PlanParseError {
    #[error("malformed plan JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("plan payload must be a JSON object")]
    NotAnObject,

    #[error("plan payload has no 'stages' array")]
    MissingStages,

    #[error("stage #{index} is not a JSON object")]
    InvalidStage { index: usize },
}

/// Result type for configuration-time operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_display_names_set_and_pattern() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = PlannerError::InvalidPattern {
            set: "custom".to_string(),
            pattern: "(".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("custom"));
        assert!(msg.contains("invalid allowlist pattern"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = PlanParseError::InvalidStage { index: 3 };
        assert!(err.to_string().contains("#3"));
        assert!(PlanParseError::MissingStages.to_string().contains("stages"));
    }
}
