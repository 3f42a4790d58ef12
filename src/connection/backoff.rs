use std::time::Duration;

use rand::Rng;

/// Exponential reconnect backoff with proportional jitter and an optional
/// attempt ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
    /// Consecutive failures tolerated before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            jitter_ratio: 0.5,
            max_attempts: Some(8),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retrying after `attempt` consecutive failures, with
    /// `jitter_unit` in `[0, 1]` selecting how much of the jitter band to add.
    pub fn delay(&self, attempt: u32, jitter_unit: f64) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 1).min(16);
        let scaled = self
            .base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay);

        let jitter_max = scaled.mul_f64(unit_interval(self.jitter_ratio));
        scaled.saturating_add(jitter_max.mul_f64(unit_interval(jitter_unit)))
    }

    /// Jittered delay for the next attempt, or `None` once the ceiling is hit.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if self.exhausted(failures) {
            return None;
        }
        let jitter_unit = rand::thread_rng().gen_range(0.0..=1.0);
        Some(self.delay(failures, jitter_unit))
    }

    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

/// `mul_f64` panics on NaN, negative or overflowing factors.
fn unit_interval(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
