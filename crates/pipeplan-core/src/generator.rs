//! Contract for the external plan generator.

use std::time::Duration;

use async_trait::async_trait;

/// Failure reported by a [`Generator`].
///
/// The generator decides whether a failure is worth retrying; the
/// orchestrator never guesses from the message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    /// May succeed on retry (overload, rate limit, timeout).
    #[error("transient generator failure: {0}")]
    Transient(String),

    /// Retrying cannot help (bad credentials, rejected prompt).
    #[error("terminal generator failure: {0}")]
    Terminal(String),
}

impl GeneratorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GeneratorError::Transient(_))
    }
}

/// Produces raw plan text for a prompt.
///
/// `timeout` is the per-attempt budget; implementations should pass it to
/// their transport. The orchestrator enforces it independently.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GeneratorError>;
}
