//! Outcome taxonomy and retry policy for generation calls

use std::time::Duration;

/// Where in the model pipeline a moderation block happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStage {
    /// The prompt itself was rejected before any generation.
    Prompt,
    /// Generated content was cut off by a safety stop.
    Content,
}

/// Result of one orchestrated generation call.
///
/// Internal retries are invisible to the caller; a `TransientFailure` carries
/// the message of the last error once the attempt budget is exhausted. Every
/// other variant is terminal on first observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success(String),
    Blocked { reason: String, stage: BlockStage },
    Empty,
    QuotaExceeded,
    AuthError,
    TransientFailure(String),
}

/// How many attempts a generation call may make and how long to wait
/// between them. A value object owned by the invocation, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay_between_attempts: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is clamped to 1.
    pub fn new(max_attempts: u32, delay_between_attempts: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_between_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_between_attempts(&self) -> Duration {
        self.delay_between_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_clamps_zero_attempts_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn retry_policy_keeps_valid_attempts() {
        let policy = RetryPolicy::new(4, Duration::from_millis(250));
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_between_attempts(), Duration::from_millis(250));
    }
}
