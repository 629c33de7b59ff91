use std::time::Duration;

use async_trait::async_trait;

/// Injectable clock so the full retry budget can run without wall-clock
/// delay in tests.
#[async_trait]
pub trait Sleeper: Sync + Send {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Maps an attempt number to the delay before the next poll.
pub trait BackoffStrategy: Sync + Send {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay between every attempt, the behavior of the underlying
/// hardware tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl BackoffStrategy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_ignores_the_attempt_number() {
        let backoff = FixedBackoff::new(Duration::from_secs(3));

        assert_eq!(Duration::from_secs(3), backoff.delay(1));
        assert_eq!(Duration::from_secs(3), backoff.delay(9));
    }
}
