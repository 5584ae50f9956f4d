//! Client-side reconnection with exponential backoff.
//!
//! [`ReconnectState`] computes exponentially increasing delays with jitter and
//! tracks when the next attempt is due. The frame loop calls
//! [`ReconnectState::due`] each tick while the channel is disconnected; no
//! timer outlives the disconnect.

use quarry_config::NetworkConfig;
use rand::Rng;
use tracing::{info, warn};

/// Configuration for client-side reconnection behaviour.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay before the first reconnection attempt. Default: 1 s.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt. Default: 2.0.
    pub backoff_multiplier: f64,
    /// Maximum delay between reconnection attempts. Default: 30 s.
    pub max_delay_ms: u64,
    /// Maximum number of attempts before giving up. Default: 20.
    pub max_attempts: u32,
    /// Jitter factor (0.0–1.0). Applied as ±jitter to the delay. Default: 0.25.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            max_attempts: 20,
            jitter: 0.25,
        }
    }
}

impl From<&NetworkConfig> for ReconnectConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            initial_delay_ms: config.reconnect_initial_delay_ms,
            backoff_multiplier: config.reconnect_backoff,
            max_delay_ms: config.reconnect_max_delay_ms,
            max_attempts: config.reconnect_max_attempts,
            jitter: config.reconnect_jitter.clamp(0.0, 1.0),
        }
    }
}

/// Tracks reconnection attempt count and the time of the next attempt.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    config: ReconnectConfig,
    attempts: u32,
    current_delay_ms: u64,
    next_attempt_at: Option<u64>,
}

impl ReconnectState {
    pub fn new(config: ReconnectConfig) -> Self {
        let initial = config.initial_delay_ms;
        Self {
            config,
            attempts: 0,
            current_delay_ms: initial,
            next_attempt_at: None,
        }
    }

    /// Compute the next delay and advance the attempt counter.
    /// Returns `None` if max attempts have been exhausted.
    pub fn next_delay(&mut self) -> Option<u64> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }

        let base = self.current_delay_ms;
        self.attempts += 1;

        // Uniform in [base * (1 - jitter), base * (1 + jitter)].
        let jittered = if self.config.jitter > 0.0 {
            let mut rng = rand::rng();
            let factor = rng.random_range((1.0 - self.config.jitter)..=(1.0 + self.config.jitter));
            (base as f64 * factor) as u64
        } else {
            base
        };

        let next = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next.min(self.config.max_delay_ms);

        Some(jittered.min(self.config.max_delay_ms))
    }

    /// Schedules the first attempt after a disconnect observed at `now`.
    /// Has no effect if an attempt is already scheduled.
    pub fn on_disconnect(&mut self, now: u64) {
        if self.next_attempt_at.is_none() && self.attempts == 0 {
            self.schedule(now);
        }
    }

    /// Returns `true` when an attempt should be made at `now`. The pending
    /// slot is consumed; call [`on_failure`](Self::on_failure) or
    /// [`reset`](Self::reset) afterwards.
    pub fn due(&mut self, now: u64) -> bool {
        match self.next_attempt_at {
            Some(at) if now >= at => {
                self.next_attempt_at = None;
                true
            }
            _ => false,
        }
    }

    /// Schedules the next attempt after a failed one.
    pub fn on_failure(&mut self, now: u64) {
        self.schedule(now);
    }

    fn schedule(&mut self, now: u64) {
        match self.next_delay() {
            Some(delay) => {
                info!("Reconnection attempt {} in {} ms", self.attempts, delay);
                self.next_attempt_at = Some(now.saturating_add(delay));
            }
            None => {
                warn!("Maximum reconnection attempts exhausted");
                self.next_attempt_at = None;
            }
        }
    }

    /// Reset the state after a successful reconnection.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
        self.next_attempt_at = None;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn next_attempt_at(&self) -> Option<u64> {
        self.next_attempt_at
    }

    /// True once every attempt has been used and nothing is scheduled.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts && self.next_attempt_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> ReconnectConfig {
        ReconnectConfig {
            jitter: 0.0,
            max_attempts: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_exponential_backoff_capped() {
        let mut state = ReconnectState::new(ReconnectConfig {
            max_delay_ms: 5_000,
            ..no_jitter()
        });
        let delays: Vec<u64> = std::iter::from_fn(|| state.next_delay()).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000, 5_000]);
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        for _ in 0..50 {
            let mut state = ReconnectState::new(ReconnectConfig::default());
            let delay = state.next_delay().unwrap();
            assert!((750..=1_250).contains(&delay), "delay {delay}");
        }
    }

    #[test]
    fn test_schedule_due_and_reset() {
        let mut state = ReconnectState::new(no_jitter());
        state.on_disconnect(10_000);
        assert_eq!(state.next_attempt_at(), Some(11_000));
        assert!(!state.due(10_999));
        assert!(state.due(11_000));
        assert!(!state.due(11_001), "slot consumed");

        state.on_failure(11_000);
        assert_eq!(state.next_attempt_at(), Some(13_000));

        state.reset();
        assert_eq!(state.attempts(), 0);
        assert_eq!(state.next_attempt_at(), None);
    }

    #[test]
    fn test_exhaustion() {
        let mut state = ReconnectState::new(ReconnectConfig {
            max_attempts: 2,
            ..no_jitter()
        });
        state.on_disconnect(0);
        assert!(state.due(1_000));
        state.on_failure(1_000);
        assert!(state.due(3_000));
        state.on_failure(3_000);
        assert!(state.exhausted());
    }
}
