//! Fixed-interval pacing between sends.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Pause applied after each recipient. Bounds throughput to ~5 messages/second.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(200);

/// Fixed delay between consecutive sends.
///
/// Sleeps on the tokio timer, so tests can run with a paused clock
/// (`#[tokio::test(start_paused = true)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    interval: Duration,
    skip_trailing: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            skip_trailing: false,
        }
    }

    /// No pacing at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Skip the pause after the final recipient.
    pub fn skip_trailing(mut self, skip: bool) -> Self {
        self.skip_trailing = skip;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether to pause after the recipient at `index` out of `total`.
    pub fn pauses_after(&self, index: usize, total: usize) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        !(self.skip_trailing && index + 1 == total)
    }

    /// Sleep for the interval. Returns `false` if `cancel` fired first.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.interval) => true,
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_pauses_after() {
        let throttle = Throttle::default();
        assert!(throttle.pauses_after(0, 2));
        assert!(throttle.pauses_after(1, 2));

        let throttle = throttle.skip_trailing(true);
        assert!(throttle.pauses_after(0, 2));
        assert!(!throttle.pauses_after(1, 2));

        assert!(!Throttle::none().pauses_after(0, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_waits_interval() {
        let start = Instant::now();
        assert!(Throttle::default().pause(&CancellationToken::new()).await);
        assert!(start.elapsed() >= DEFAULT_SEND_INTERVAL);
        assert!(start.elapsed() < DEFAULT_SEND_INTERVAL + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_interrupted_by_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = Instant::now();
        assert!(!Throttle::new(Duration::from_secs(60)).pause(&cancel).await);
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
