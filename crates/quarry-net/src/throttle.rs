//! Fixed-interval gate for outbound broadcasts.

/// Lets at most one send through per `interval_ms`, independent of the
/// frame rate.
#[derive(Debug, Clone)]
pub struct BroadcastThrottle {
    interval_ms: u64,
    last_sent: Option<u64>,
}

impl BroadcastThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_sent(&self) -> Option<u64> {
        self.last_sent
    }

    /// Returns `true` and records the send if the interval has elapsed.
    pub fn try_acquire(&mut self, now: u64) -> bool {
        let ready = match self.last_sent {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
        };
        if ready {
            self.last_sent = Some(now);
        }
        ready
    }

    /// Forces the next call to [`try_acquire`](Self::try_acquire) through.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixty_fps_yields_ten_sends_per_second() {
        let mut throttle = BroadcastThrottle::new(100);
        let sent = (0..60)
            .map(|frame| frame * 1000 / 60)
            .filter(|&now| throttle.try_acquire(now))
            .count();
        assert_eq!(sent, 10);
    }

    #[test]
    fn test_reset_allows_immediate_send() {
        let mut throttle = BroadcastThrottle::new(100);
        assert!(throttle.try_acquire(0));
        assert!(!throttle.try_acquire(50));
        throttle.reset();
        assert!(throttle.try_acquire(50));
        assert_eq!(throttle.last_sent(), Some(50));
    }
}
