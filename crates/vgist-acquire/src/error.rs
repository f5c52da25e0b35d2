//! Error types for acquisition.

use thiserror::Error;

/// Result type for orchestrator-level operations.
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Failure of a single strategy attempt.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The URL shape doesn't match this strategy's preconditions. Skipped,
    /// not failed: never recorded in the aggregate failure list.
    #[error("strategy not applicable")]
    NotApplicable,

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("blocked or rate limited: {0}")]
    BlockedOrRateLimited(String),

    #[error("no downloadable stream found: {0}")]
    NoStreamFound(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrategyError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientNetwork(message.into())
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::BlockedOrRateLimited(message.into())
    }

    pub fn no_stream(message: impl Into<String>) -> Self {
        Self::NoStreamFound(message.into())
    }
}

impl From<reqwest::Error> for StrategyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TransientNetwork(format!("request timed out: {e}"))
        } else if let Some(status) = e.status() {
            match status.as_u16() {
                403 | 429 => Self::BlockedOrRateLimited(status.to_string()),
                404 | 410 => Self::NoStreamFound(status.to_string()),
                _ => Self::TransientNetwork(status.to_string()),
            }
        } else {
            Self::TransientNetwork(e.to_string())
        }
    }
}

/// One failed attempt, retained for the aggregate error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub strategy: &'static str,
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Terminal outcome of an `acquire` call that produced no file.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Classification found nothing acquirable. A valid terminal state, not
    /// an error condition for the caller.
    #[error("no supported video found at this URL")]
    NotAVideo,

    #[error("all acquisition strategies exhausted: [{}]",
        attempts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    AllStrategiesExhausted { attempts: Vec<AttemptFailure> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_error_lists_every_attempt() {
        let error = AcquireError::AllStrategiesExhausted {
            attempts: vec![
                AttemptFailure {
                    strategy: "mirror_proxy",
                    reason: "timed out after 10s".to_string(),
                },
                AttemptFailure {
                    strategy: "direct_http",
                    reason: "blocked or rate limited: 429".to_string(),
                },
            ],
        };

        let rendered = error.to_string();
        assert!(rendered.contains("mirror_proxy: timed out after 10s"));
        assert!(rendered.contains("direct_http: blocked"));
    }
}
