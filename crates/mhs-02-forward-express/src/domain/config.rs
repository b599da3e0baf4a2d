//! Sender configuration.

use std::time::Duration;

/// Redelivery and ack-wait settings for the send path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderConfig {
    /// Redeliveries after the first attempt.
    pub maximum_redeliveries: u32,
    /// Fixed pause between attempts.
    pub redelivery_delay: Duration,
    /// How long an exchange waits for its asynchronous ack.
    pub ack_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            maximum_redeliveries: 2,
            redelivery_delay: Duration::from_millis(2000),
            ack_timeout: Duration::from_millis(30_000),
        }
    }
}

impl SenderConfig {
    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.maximum_redeliveries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SenderConfig::default();
        assert_eq!(config.maximum_redeliveries, 2);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.redelivery_delay, Duration::from_secs(2));
        assert_eq!(config.ack_timeout, Duration::from_secs(30));
    }
}
