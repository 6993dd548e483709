//! Exponential backoff for retrying loops.

use std::time::Duration;

/// Doubling delay, capped, reset on success.
///
/// Used by the accept loop between transient accept failures so a
/// misbehaving socket cannot spin the runtime.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: Duration::ZERO,
        }
    }

    /// Advance and return the next delay.
    pub fn next_delay(&mut self) -> Duration {
        self.current = if self.current.is_zero() {
            self.base
        } else {
            self.current.saturating_mul(2)
        }
        .min(self.max);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(30));
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(30));
        assert_eq!(backoff.next_delay(), Duration::from_millis(30));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
    }
}
